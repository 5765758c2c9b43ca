//! Events handed to the notification dispatcher after a change commits.

use crate::status::TicketStatus;
use crate::user::Actor;

/// Something worth telling people about.
///
/// Events carry the actor snapshot that caused them. The ticket itself travels
/// separately, as committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketEvent {
    /// A ticket was raised
    NewTicket {
        /// Who raised it
        author: Actor,
    },
    /// Status moved
    StatusChanged {
        /// Previous status
        from: TicketStatus,
        /// New status
        to: TicketStatus,
        /// Who requested the move
        initiator: Actor,
    },
    /// A staff member took the ticket
    Assigned {
        /// The new assignee
        assignee: Actor,
    },
    /// Urgency tag set (clearing it is silent)
    Urgent {
        /// Who set it
        initiator: Actor,
    },
    /// A human message was posted
    NewMessage {
        /// Who wrote it
        sender: Actor,
        /// Message body
        text: String,
    },
}

impl TicketEvent {
    /// Short name used in logs and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewTicket { .. } => "new_ticket",
            Self::StatusChanged { .. } => "status_changed",
            Self::Assigned { .. } => "assigned",
            Self::Urgent { .. } => "urgent",
            Self::NewMessage { .. } => "new_message",
        }
    }
}
