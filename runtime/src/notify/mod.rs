//! Notification dispatch.
//!
//! Lifecycle events become one notification per recipient, delivered through
//! a [`NotificationSink`] after the change has committed. Delivery is
//! best-effort: failures are logged and counted, never retried, and never
//! reach the operation that caused them.

mod dispatcher;
mod log;
mod telegram;
pub mod templates;

pub use dispatcher::{DispatchError, NotificationDispatcher};
pub use log::LogSink;
pub use telegram::TelegramSink;

use async_trait::async_trait;
use helpdesk_core::{ExternalId, TicketId};
use thiserror::Error;

/// One outbound message to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Chat to deliver to
    pub recipient: ExternalId,
    /// HTML body
    pub text: String,
    /// Ticket the notification is about
    pub ticket_id: TicketId,
    /// Deep link opening the ticket, when a web app URL is configured
    pub open_url: Option<String>,
    /// Event name, for logs and metrics
    pub event: &'static str,
}

/// Why a delivery failed.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The request never got a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote side refused the message
    #[error("rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },
}

/// Outbound notification channel.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), SinkError>;
}
