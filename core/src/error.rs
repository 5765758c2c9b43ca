//! Error taxonomy of the ticket lifecycle.

use crate::status::TicketStatus;
use thiserror::Error;

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Everything a ticket operation can fail with.
///
/// `NotFound` and `Forbidden` stay distinct here. Blurring them is a decision
/// taken only at the outermost request boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// Entity absent.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity ("ticket", "attachment", ...)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Authenticated but not allowed to do this to this entity.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The status table has no such edge.
    #[error("transition {from} → {to} is not allowed")]
    InvalidTransition {
        /// Current status
        from: TicketStatus,
        /// Requested status
        to: TicketStatus,
    },

    /// Valid request refused because of the entity's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The ticket already has an assignee.
    #[error("ticket already assigned")]
    AlreadyAssigned,

    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Attachment bigger than the configured maximum.
    #[error("file too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Size of the rejected payload
        size: u64,
        /// Configured maximum
        max: u64,
    },

    /// Attachment extension is on the forbidden list.
    #[error("file type {extension} is not allowed")]
    DisallowedFileType {
        /// Lower-cased extension including the leading dot
        extension: String,
    },

    /// The store failed underneath the operation.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Coarse classification used by boundaries to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entity absent
    NotFound,
    /// Not authorized
    Forbidden,
    /// Status table violation
    InvalidTransition,
    /// Refused by current entity state
    Conflict,
    /// Bad input
    Validation,
    /// Attachment too big
    PayloadTooLarge,
    /// Attachment type refused
    DisallowedFileType,
    /// Infrastructure failure
    Internal,
}

impl TicketError {
    /// Shorthand for a missing ticket.
    #[must_use]
    pub fn ticket_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "ticket",
            id: id.to_string(),
        }
    }

    /// Shorthand for an authorization failure.
    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Conflict(_) | Self::AlreadyAssigned => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::Validation,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::DisallowedFileType { .. } => ErrorKind::DisallowedFileType,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}
