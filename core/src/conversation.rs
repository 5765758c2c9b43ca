//! Conversation log: the append-only message sequence of a ticket.
//!
//! Entries are never edited or removed. Retrieval order is ascending
//! `created_at`, with ties broken by the store-assigned id (insertion order).

use crate::attachment::NewAttachment;
use crate::role::SenderRole;
use crate::status::TicketStatus;
use crate::types::{MessageId, TicketId, UserId};
use crate::user::Actor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix shared by every system-generated entry.
const SYSTEM_PREFIX: &str = "──";

/// A persisted conversation entry.
///
/// `sender_id` is `None` exactly when `sender_role` is `System`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned, monotonic identifier
    pub id: MessageId,
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Human sender, absent for system entries
    pub sender_id: Option<UserId>,
    /// Sender's role at send time
    pub sender_role: SenderRole,
    /// Body
    pub text: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether the lifecycle generated this entry.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self.sender_role, SenderRole::System)
    }

    /// Ordering key used for display.
    #[must_use]
    pub const fn sort_key(&self) -> (DateTime<Utc>, MessageId) {
        (self.created_at, self.id)
    }
}

/// A conversation entry that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Human sender, absent for system entries
    pub sender_id: Option<UserId>,
    /// Sender's role snapshot
    pub sender_role: SenderRole,
    /// Body
    pub text: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// File sent together with the message
    pub attachment: Option<NewAttachment>,
}

impl NewMessage {
    /// A system entry announcing a lifecycle side effect.
    #[must_use]
    pub fn system(ticket_id: TicketId, notice: SystemNotice, at: DateTime<Utc>) -> Self {
        Self {
            ticket_id,
            sender_id: None,
            sender_role: SenderRole::System,
            text: notice.text(),
            created_at: at,
            attachment: None,
        }
    }

    /// An entry written by `actor`, with the actor's current role recorded.
    #[must_use]
    pub fn from_actor(
        ticket_id: TicketId,
        actor: &Actor,
        text: String,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            sender_id: Some(actor.id),
            sender_role: actor.role.into(),
            text,
            created_at: at,
            attachment: None,
        }
    }

    /// Attach a file to this entry.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Option<NewAttachment>) -> Self {
        self.attachment = attachment;
        self
    }

    /// Turn into a persisted entry once the store has assigned an id.
    #[must_use]
    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            ticket_id: self.ticket_id,
            sender_id: self.sender_id,
            sender_role: self.sender_role,
            text: self.text,
            created_at: self.created_at,
        }
    }
}

/// Lifecycle side effects that leave a trace in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemNotice {
    /// Status moved between two states
    StatusChanged {
        /// Previous status
        from: TicketStatus,
        /// New status
        to: TicketStatus,
    },
    /// Urgency tag set
    UrgentSet,
    /// Urgency tag cleared
    UrgentCleared,
}

impl SystemNotice {
    /// Rendered text of the entry.
    ///
    /// Moves into `closed` and `reopened` have their own wording; every other
    /// move names both status labels.
    #[must_use]
    pub fn text(self) -> String {
        match self {
            Self::StatusChanged {
                to: TicketStatus::Closed,
                ..
            } => format!("{SYSTEM_PREFIX} Обращение закрыто"),
            Self::StatusChanged {
                to: TicketStatus::Reopened,
                ..
            } => format!("{SYSTEM_PREFIX} Обращение переоткрыто"),
            Self::StatusChanged { from, to } => format!(
                "{SYSTEM_PREFIX} Статус изменён: {} → {}",
                from.label(),
                to.label()
            ),
            Self::UrgentSet => format!("{SYSTEM_PREFIX} Тег «Срочно» установлен"),
            Self::UrgentCleared => format!("{SYSTEM_PREFIX} Тег «Срочно» снят"),
        }
    }
}

/// The ordered conversation of one ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    entries: Vec<Message>,
}

impl ConversationLog {
    /// Build a log from entries in any order.
    #[must_use]
    pub fn from_messages(mut entries: Vec<Message>) -> Self {
        entries.sort_by_key(Message::sort_key);
        Self { entries }
    }

    /// Add an entry, keeping display order.
    pub fn append(&mut self, message: Message) {
        let key = message.sort_key();
        let at = self.entries.partition_point(|entry| entry.sort_key() <= key);
        self.entries.insert(at, message);
    }

    /// Entries in display order.
    #[must_use]
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume into entries in display order.
    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        self.entries
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::role::Role;
    use crate::types::ExternalId;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn entry(id: i64, at: DateTime<Utc>) -> Message {
        NewMessage::system(TicketId(1), SystemNotice::UrgentSet, at).into_message(MessageId(id))
    }

    #[test]
    fn status_notice_texts() {
        let generic = SystemNotice::StatusChanged {
            from: TicketStatus::New,
            to: TicketStatus::InProgress,
        };
        assert_eq!(generic.text(), "── Статус изменён: Новое → В работе");

        let closed = SystemNotice::StatusChanged {
            from: TicketStatus::BizReview,
            to: TicketStatus::Closed,
        };
        assert_eq!(closed.text(), "── Обращение закрыто");

        let reopened = SystemNotice::StatusChanged {
            from: TicketStatus::Closed,
            to: TicketStatus::Reopened,
        };
        assert_eq!(reopened.text(), "── Обращение переоткрыто");
    }

    #[test]
    fn system_entries_have_no_sender() {
        let message = NewMessage::system(TicketId(1), SystemNotice::UrgentCleared, t0());
        assert_eq!(message.sender_id, None);
        assert_eq!(message.sender_role, SenderRole::System);
        assert_eq!(message.text, "── Тег «Срочно» снят");
    }

    #[test]
    fn actor_entries_snapshot_role() {
        let actor = Actor {
            id: UserId(3),
            role: Role::Support,
            external_id: ExternalId(30),
            display_name: "Support".into(),
            username: None,
        };
        let message = NewMessage::from_actor(TicketId(1), &actor, "hi".into(), t0());
        assert_eq!(message.sender_id, Some(UserId(3)));
        assert_eq!(message.sender_role, SenderRole::Support);
    }

    #[test]
    fn ties_are_broken_by_id() {
        let later = t0() + Duration::seconds(5);
        let log = ConversationLog::from_messages(vec![
            entry(3, t0()),
            entry(1, later),
            entry(2, t0()),
        ]);
        let ids: Vec<_> = log.entries().iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn append_keeps_order() {
        let mut log = ConversationLog::default();
        log.append(entry(1, t0()));
        log.append(entry(2, t0()));
        log.append(entry(3, t0() - Duration::seconds(1)));
        let ids: Vec<_> = log.into_messages().iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
