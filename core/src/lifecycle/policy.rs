//! Role decision table for lifecycle changes.

use crate::error::{Result, TicketError};
use crate::role::Role;
use crate::status::TicketStatus;
use crate::ticket::Ticket;
use crate::user::Actor;

/// Decide whether `actor` may move `ticket` to `target`.
///
/// The transition table is consulted first, so a move that exists for nobody
/// is an `InvalidTransition` whoever asks. Role rules apply after that:
///
/// | role            | may request                                           |
/// |-----------------|-------------------------------------------------------|
/// | support, admin  | any move in the table                                 |
/// | author (owner)  | `biz_review → closed`, `closed → reopened`            |
///
/// # Errors
///
/// - [`TicketError::InvalidTransition`] if the table has no such edge
/// - [`TicketError::Forbidden`] if the role rules refuse it
pub fn authorize_transition(actor: &Actor, ticket: &Ticket, target: TicketStatus) -> Result<()> {
    let from = ticket.status;
    if !from.can_transition_to(target) {
        return Err(TicketError::InvalidTransition { from, to: target });
    }

    match actor.role {
        Role::Support | Role::Admin => Ok(()),
        Role::Author => authorize_author_transition(actor, ticket, target),
    }
}

fn authorize_author_transition(actor: &Actor, ticket: &Ticket, target: TicketStatus) -> Result<()> {
    match (ticket.status, target) {
        (TicketStatus::BizReview, TicketStatus::Closed)
        | (TicketStatus::Closed, TicketStatus::Reopened) => {}
        (_, TicketStatus::Closed) => {
            return Err(TicketError::forbidden(
                "author can close only from biz_review",
            ));
        }
        (_, TicketStatus::Reopened) => {
            return Err(TicketError::forbidden(
                "author can reopen only closed tickets",
            ));
        }
        _ => return Err(TicketError::forbidden("insufficient permissions")),
    }

    if ticket.is_authored_by(actor.id) {
        Ok(())
    } else {
        Err(TicketError::forbidden("not your ticket"))
    }
}

/// Decide whether `actor` may take `ticket`.
///
/// A ticket that already has an assignee refuses everyone, staff or not.
///
/// # Errors
///
/// - [`TicketError::AlreadyAssigned`] if an assignee is set
/// - [`TicketError::Forbidden`] if `actor` is not staff
pub fn authorize_assign(actor: &Actor, ticket: &Ticket) -> Result<()> {
    if ticket.assignee_id.is_some() {
        return Err(TicketError::AlreadyAssigned);
    }
    if !actor.is_staff() {
        return Err(TicketError::forbidden("insufficient permissions"));
    }
    Ok(())
}

/// Staff or the ticket's own author may toggle urgency.
///
/// # Errors
///
/// Returns [`TicketError::Forbidden`] for any other author.
pub fn authorize_urgency(actor: &Actor, ticket: &Ticket) -> Result<()> {
    if actor.is_staff() || ticket.is_authored_by(actor.id) {
        Ok(())
    } else {
        Err(TicketError::forbidden("not your ticket"))
    }
}
