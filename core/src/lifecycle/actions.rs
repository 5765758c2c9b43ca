//! Actions the lifecycle reducer accepts.

use crate::attachment::NewAttachment;
use crate::status::TicketStatus;
use crate::ticket::TicketPatch;
use crate::user::Actor;

/// A requested change to an existing ticket.
///
/// Every action carries the actor performing it; authorization is part of
/// reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketAction {
    /// Move the ticket to another status.
    ChangeStatus {
        /// Who asks
        actor: Actor,
        /// Requested status
        target: TicketStatus,
    },

    /// Take the ticket. Moves a `new` ticket to `in_progress` as well.
    Assign {
        /// The staff member taking it
        actor: Actor,
    },

    /// Set or clear the urgency tag.
    SetUrgent {
        /// Who asks
        actor: Actor,
        /// Desired flag value
        urgent: bool,
    },

    /// Change ticket content while it is still `new`.
    Edit {
        /// Who asks
        actor: Actor,
        /// Fields to change
        patch: TicketPatch,
    },

    /// Post a conversation message, optionally with one file.
    PostMessage {
        /// Sender
        actor: Actor,
        /// Message body
        text: String,
        /// File sent with the message, bytes already stored
        attachment: Option<NewAttachment>,
    },

    /// Attach a file to the ticket itself.
    AttachFile {
        /// Uploader
        actor: Actor,
        /// The file, bytes already stored
        attachment: NewAttachment,
    },
}

impl TicketAction {
    /// The actor performing the action.
    #[must_use]
    pub const fn actor(&self) -> &Actor {
        match self {
            Self::ChangeStatus { actor, .. }
            | Self::Assign { actor }
            | Self::SetUrgent { actor, .. }
            | Self::Edit { actor, .. }
            | Self::PostMessage { actor, .. }
            | Self::AttachFile { actor, .. } => actor,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ChangeStatus { .. } => "change_status",
            Self::Assign { .. } => "assign",
            Self::SetUrgent { .. } => "set_urgent",
            Self::Edit { .. } => "edit",
            Self::PostMessage { .. } => "post_message",
            Self::AttachFile { .. } => "attach_file",
        }
    }
}
