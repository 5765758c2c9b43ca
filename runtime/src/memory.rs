//! In-memory implementation of [`HelpdeskStore`].
//!
//! One mutex guards the whole dataset, so every operation is serialized.
//! Used when no database is configured, and in tests.

use crate::store::{Changes, Committed, HelpdeskStore, TicketMutation, UserUpsert};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use helpdesk_core::access::ListQuery;
use helpdesk_core::attachment::{Attachment, StoredReference};
use helpdesk_core::conversation::{ConversationLog, Message};
use helpdesk_core::numbering::TicketNumber;
use helpdesk_core::{
    AttachmentId, MessageId, Ticket, TicketDraft, TicketError, TicketId, User, UserId,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Dataset {
    users: BTreeMap<UserId, User>,
    tickets: BTreeMap<TicketId, Ticket>,
    conversations: HashMap<TicketId, ConversationLog>,
    attachments: Vec<Attachment>,
    next_user: i64,
    next_ticket: i64,
    next_message: i64,
    next_attachment: i64,
}

impl Dataset {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn commit(&mut self, ticket: Ticket, changes: Changes) -> Committed {
        let Changes {
            messages,
            attachments,
            events,
        } = changes;
        let mut committed_messages = Vec::with_capacity(messages.len());
        let mut committed_attachments = Vec::new();

        for mut new_message in messages {
            let attachment = new_message.attachment.take();
            let message =
                new_message.into_message(MessageId(Self::next_id(&mut self.next_message)));
            if let Some(attachment) = attachment {
                let id = AttachmentId(Self::next_id(&mut self.next_attachment));
                committed_attachments.push(attachment.into_attachment(id, Some(message.id)));
            }
            self.conversations
                .entry(ticket.id)
                .or_default()
                .append(message.clone());
            committed_messages.push(message);
        }

        for attachment in attachments {
            let id = AttachmentId(Self::next_id(&mut self.next_attachment));
            committed_attachments.push(attachment.into_attachment(id, None));
        }
        self.attachments.extend(committed_attachments.iter().cloned());
        self.tickets.insert(ticket.id, ticket.clone());

        Committed {
            ticket,
            messages: committed_messages,
            attachments: committed_attachments,
            events,
        }
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: Mutex<Dataset>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HelpdeskStore for InMemoryStore {
    async fn upsert_user(&self, upsert: UserUpsert) -> Result<User, TicketError> {
        let mut data = self.data.lock().await;
        if let Some(user) = data
            .users
            .values_mut()
            .find(|user| user.external_id == upsert.external_id)
        {
            user.username = upsert.username;
            user.display_name = upsert.display_name;
            user.role = upsert.role;
            return Ok(user.clone());
        }

        let user = User {
            id: UserId(Dataset::next_id(&mut data.next_user)),
            external_id: upsert.external_id,
            username: upsert.username,
            display_name: upsert.display_name,
            role: upsert.role,
            created_at: upsert.at,
        };
        data.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, TicketError> {
        Ok(self.data.lock().await.users.get(&id).cloned())
    }

    async fn create_ticket(
        &self,
        author: UserId,
        draft: TicketDraft,
        at: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let mut data = self.data.lock().await;
        let created_this_year = data
            .tickets
            .values()
            .filter(|ticket| ticket.created_at.year() == at.year())
            .count() as u64;
        let number = TicketNumber::for_instant(at, created_this_year).to_string();

        let id = TicketId(Dataset::next_id(&mut data.next_ticket));
        let ticket = Ticket::open(id, number, author, draft, at);
        data.tickets.insert(id, ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, TicketError> {
        Ok(self.data.lock().await.tickets.get(&id).cloned())
    }

    async fn list_tickets(&self, query: &ListQuery) -> Result<Vec<Ticket>, TicketError> {
        let data = self.data.lock().await;
        Ok(query.apply(data.tickets.values().cloned()))
    }

    async fn modify_ticket(
        &self,
        id: TicketId,
        mutation: TicketMutation,
    ) -> Result<Committed, TicketError> {
        let mut data = self.data.lock().await;
        let mut ticket = data
            .tickets
            .get(&id)
            .cloned()
            .ok_or_else(|| TicketError::ticket_not_found(id))?;

        let changes = mutation(&mut ticket)?;
        Ok(data.commit(ticket, changes))
    }

    async fn list_messages(&self, ticket: TicketId) -> Result<Vec<Message>, TicketError> {
        let data = self.data.lock().await;
        Ok(data
            .conversations
            .get(&ticket)
            .map(|log| log.entries().to_vec())
            .unwrap_or_default())
    }

    async fn ticket_attachments(&self, ticket: TicketId) -> Result<Vec<Attachment>, TicketError> {
        let data = self.data.lock().await;
        Ok(data
            .attachments
            .iter()
            .filter(|a| a.ticket_id == ticket && a.message_id.is_none())
            .cloned()
            .collect())
    }

    async fn message_attachments(
        &self,
        ticket: TicketId,
    ) -> Result<Vec<Attachment>, TicketError> {
        let data = self.data.lock().await;
        Ok(data
            .attachments
            .iter()
            .filter(|a| a.ticket_id == ticket && a.message_id.is_some())
            .cloned()
            .collect())
    }

    async fn find_attachment(
        &self,
        reference: &StoredReference,
    ) -> Result<Option<Attachment>, TicketError> {
        let data = self.data.lock().await;
        let ticket_level = data
            .attachments
            .iter()
            .find(|a| a.message_id.is_none() && &a.reference == reference);
        let message_level = || {
            data.attachments
                .iter()
                .find(|a| a.message_id.is_some() && &a.reference == reference)
        };
        Ok(ticket_level.or_else(message_level).cloned())
    }

    async fn ping(&self) -> Result<(), TicketError> {
        Ok(())
    }
}
