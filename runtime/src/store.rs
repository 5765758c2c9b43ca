//! Persistence seam of the helpdesk.
//!
//! The registry only needs three guarantees from a store:
//! - atomic read-modify-write of one ticket together with the conversation
//!   entries and attachment rows that change implies
//! - ordered retrieval of a ticket's conversation
//! - a lookup of attachments by stored reference

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_core::access::ListQuery;
use helpdesk_core::attachment::{Attachment, NewAttachment, StoredReference};
use helpdesk_core::conversation::{Message, NewMessage};
use helpdesk_core::effect::Effect;
use helpdesk_core::events::TicketEvent;
use helpdesk_core::{ExternalId, Role, Ticket, TicketDraft, TicketError, TicketId, User, UserId};
use thiserror::Error;

/// Failures of the storage layer itself.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database failed
    #[error("database error: {0}")]
    Database(String),

    /// Two tickets were handed the same number
    #[error("ticket number {0} is already taken")]
    DuplicateNumber(String),

    /// A stored row could not be turned back into a domain value
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for TicketError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateNumber(number) => {
                Self::Conflict(format!("ticket number {number} is already taken"))
            }
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Profile data written on every successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpsert {
    /// Identity provider id, the upsert key
    pub external_id: ExternalId,
    /// Handle at the identity provider
    pub username: Option<String>,
    /// Name shown to others
    pub display_name: String,
    /// Freshly derived role
    pub role: Role,
    /// Used as `created_at` when the user is new
    pub at: DateTime<Utc>,
}

/// What a ticket mutation adds next to the ticket row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    /// Conversation entries to append, in order
    pub messages: Vec<NewMessage>,
    /// Ticket-level attachment rows to insert
    pub attachments: Vec<NewAttachment>,
    /// Events to hand back untouched once committed
    pub events: Vec<TicketEvent>,
}

impl Changes {
    /// Sort reducer effects into what must be persisted and what is
    /// announced afterwards.
    #[must_use]
    pub fn from_effects(effects: impl IntoIterator<Item = Effect>) -> Self {
        let mut changes = Self::default();
        for effect in effects {
            match effect {
                Effect::None => {}
                Effect::AppendMessage(message) => changes.messages.push(message),
                Effect::AttachFile(attachment) => changes.attachments.push(attachment),
                Effect::Notify(event) => changes.events.push(event),
            }
        }
        changes
    }
}

/// Result of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Ticket as written
    pub ticket: Ticket,
    /// Appended entries with their assigned ids
    pub messages: Vec<Message>,
    /// Inserted attachment rows, ticket-level and message-level
    pub attachments: Vec<Attachment>,
    /// Events carried through from [`Changes`]
    pub events: Vec<TicketEvent>,
}

/// A change applied to a ticket while the store holds it exclusively.
///
/// Returning `Err` aborts the unit: nothing is written.
pub type TicketMutation = Box<dyn FnOnce(&mut Ticket) -> Result<Changes, TicketError> + Send>;

/// Durable record of users, tickets, conversations and attachments.
///
/// Every method maps storage failures to [`TicketError::Storage`] (or
/// [`TicketError::Conflict`] for a duplicate ticket number).
#[async_trait]
pub trait HelpdeskStore: Send + Sync {
    /// Create the user on first sight, otherwise refresh username, display
    /// name and role.
    async fn upsert_user(&self, user: UserUpsert) -> Result<User, TicketError>;

    /// Load a user.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, TicketError>;

    /// Create a ticket in status `new`, numbering it from the count of
    /// tickets created in the same calendar year.
    async fn create_ticket(
        &self,
        author: UserId,
        draft: TicketDraft,
        at: DateTime<Utc>,
    ) -> Result<Ticket, TicketError>;

    /// Load a ticket.
    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, TicketError>;

    /// Tickets matching `query`, newest `updated_at` first.
    async fn list_tickets(&self, query: &ListQuery) -> Result<Vec<Ticket>, TicketError>;

    /// Run `mutation` against the current ticket under an exclusive lock and
    /// persist the ticket with everything the mutation added, atomically.
    ///
    /// Returns `NotFound` when the ticket is absent, or the mutation's own
    /// error, in both cases without writing anything.
    async fn modify_ticket(
        &self,
        id: TicketId,
        mutation: TicketMutation,
    ) -> Result<Committed, TicketError>;

    /// Conversation of a ticket, ascending `created_at`, ties by id.
    async fn list_messages(&self, ticket: TicketId) -> Result<Vec<Message>, TicketError>;

    /// Ticket-level attachments of a ticket, in upload order.
    async fn ticket_attachments(&self, ticket: TicketId) -> Result<Vec<Attachment>, TicketError>;

    /// Message-level attachments of every message of a ticket.
    async fn message_attachments(&self, ticket: TicketId)
    -> Result<Vec<Attachment>, TicketError>;

    /// Resolve a stored reference, ticket-level rows first.
    async fn find_attachment(
        &self,
        reference: &StoredReference,
    ) -> Result<Option<Attachment>, TicketError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), TicketError>;
}
