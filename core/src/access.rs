//! Access gate: who may see, edit and talk on a ticket.
//!
//! Every check keeps `Forbidden` distinct from `NotFound`. Callers load the
//! ticket first and report a missing one themselves.

use crate::error::{Result, TicketError};
use crate::role::Role;
use crate::status::TicketStatus;
use crate::ticket::Ticket;
use crate::types::UserId;
use crate::user::Actor;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Staff may read anything; an author only their own tickets.
///
/// # Errors
///
/// Returns [`TicketError::Forbidden`] when `actor` may not see `ticket`.
pub fn authorize_read(actor: &Actor, ticket: &Ticket) -> Result<()> {
    if actor.is_staff() || ticket.is_authored_by(actor.id) {
        Ok(())
    } else {
        Err(TicketError::forbidden("access denied"))
    }
}

/// Only the ticket's own author may edit it, and only while it is `new`.
///
/// Staff cannot edit ticket content through this path.
///
/// # Errors
///
/// Returns [`TicketError::Forbidden`] for anyone but the author, or when the
/// status is not `new`.
pub fn authorize_edit(actor: &Actor, ticket: &Ticket) -> Result<()> {
    if !ticket.is_authored_by(actor.id) {
        return Err(TicketError::forbidden("only the author can edit"));
    }
    if ticket.status != TicketStatus::New {
        return Err(TicketError::forbidden(
            "editing is only allowed in status new",
        ));
    }
    Ok(())
}

/// Read rule plus: a closed ticket accepts no messages.
///
/// # Errors
///
/// - [`TicketError::Forbidden`] if the read rule fails
/// - [`TicketError::Conflict`] if the ticket is closed
pub fn authorize_message(actor: &Actor, ticket: &Ticket) -> Result<()> {
    authorize_read(actor, ticket)?;
    if ticket.status == TicketStatus::Closed {
        return Err(TicketError::Conflict(
            "cannot send messages to a closed ticket".to_string(),
        ));
    }
    Ok(())
}

/// Ticket-level uploads follow the read rule in any status.
///
/// # Errors
///
/// Returns [`TicketError::Forbidden`] if the read rule fails.
pub fn authorize_upload(actor: &Actor, ticket: &Ticket) -> Result<()> {
    authorize_read(actor, ticket)
}

/// Listing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    /// Every ticket; staff only
    All,
    /// Tickets authored by the actor, whatever their role
    #[default]
    Mine,
    /// Closed tickets; authors see only their own
    Closed,
}

impl FromStr for ListMode {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "mine" => Ok(Self::Mine),
            "closed" => Ok(Self::Closed),
            other => Err(TicketError::Validation(format!(
                "unknown list filter: {other}"
            ))),
        }
    }
}

/// A resolved ticket listing: which tickets match, after authorization.
///
/// Results are ordered by `updated_at` descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Restrict to tickets authored by this user
    pub author: Option<UserId>,
    /// Restrict to this status
    pub status: Option<TicketStatus>,
    /// Restrict by urgency
    pub urgent: Option<bool>,
}

impl ListQuery {
    /// Authorize `mode` for `actor` and turn it into filters.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Forbidden`] when an author asks for `all`.
    pub fn resolve(actor: &Actor, mode: ListMode, urgent: Option<bool>) -> Result<Self> {
        let query = match (mode, actor.role) {
            (ListMode::All, Role::Author) => {
                return Err(TicketError::forbidden("access denied"));
            }
            (ListMode::All, Role::Support | Role::Admin) => Self::default(),
            (ListMode::Mine, _) => Self {
                author: Some(actor.id),
                ..Self::default()
            },
            (ListMode::Closed, Role::Author) => Self {
                author: Some(actor.id),
                status: Some(TicketStatus::Closed),
                ..Self::default()
            },
            (ListMode::Closed, Role::Support | Role::Admin) => Self {
                status: Some(TicketStatus::Closed),
                ..Self::default()
            },
        };
        Ok(Self { urgent, ..query })
    }

    /// Whether `ticket` passes every filter.
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.author.is_none_or(|author| ticket.author_id == author)
            && self.status.is_none_or(|status| ticket.status == status)
            && self.urgent.is_none_or(|urgent| ticket.is_urgent == urgent)
    }

    /// Apply the filters and the display order to a set of tickets.
    #[must_use]
    pub fn apply(&self, tickets: impl IntoIterator<Item = Ticket>) -> Vec<Ticket> {
        let mut matching: Vec<Ticket> = tickets.into_iter().filter(|t| self.matches(t)).collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        matching
    }
}
