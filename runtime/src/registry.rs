//! Ticket registry: the externally visible ticket operations.
//!
//! Every mutating operation follows the same shape:
//!
//! 1. the store locks the ticket (or reports `NotFound`)
//! 2. the lifecycle reducer authorizes and applies the change
//! 3. the store persists the ticket with its new conversation entries and
//!    attachment rows in one unit
//! 4. after commit, events are handed to the notification dispatcher
//!
//! Notification problems never change the outcome of an operation.

use crate::blob::BlobStore;
use crate::metrics;
use crate::notify::NotificationDispatcher;
use crate::store::{Changes, Committed, HelpdeskStore};
use crate::views::{MessageView, TicketView};
use helpdesk_core::access::{self, ListMode, ListQuery};
use helpdesk_core::attachment::{
    Attachment, AttachmentPolicy, FALLBACK_FILENAME, NewAttachment, StoredReference,
};
use helpdesk_core::environment::Clock;
use helpdesk_core::events::TicketEvent;
use helpdesk_core::lifecycle::{
    LifecycleEnvironment, ProductionLifecycleEnvironment, TicketAction, TicketLifecycleReducer,
};
use helpdesk_core::reducer::Reducer;
use helpdesk_core::{
    Actor, Ticket, TicketDraft, TicketError, TicketId, TicketPatch, TicketStatus, User, UserId,
};
use std::sync::Arc;

type Result<T> = std::result::Result<T, TicketError>;

/// A file received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Client-supplied name, untrusted
    pub filename: String,
    /// Content
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Build an upload, falling back to a generic name when none is given.
    #[must_use]
    pub fn new(filename: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| FALLBACK_FILENAME.to_string()),
            bytes,
        }
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Orchestrates the lifecycle, the access gate and the store.
#[derive(Clone)]
pub struct TicketRegistry {
    store: Arc<dyn HelpdeskStore>,
    blobs: Arc<dyn BlobStore>,
    dispatcher: NotificationDispatcher,
    env: ProductionLifecycleEnvironment,
    reducer: TicketLifecycleReducer,
}

impl TicketRegistry {
    /// Create a registry.
    #[must_use]
    pub fn new(
        store: Arc<dyn HelpdeskStore>,
        blobs: Arc<dyn BlobStore>,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        attachment_policy: AttachmentPolicy,
    ) -> Self {
        Self {
            store,
            blobs,
            dispatcher,
            env: ProductionLifecycleEnvironment::new(clock, attachment_policy),
            reducer: TicketLifecycleReducer::new(),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn HelpdeskStore> {
        &self.store
    }

    /// The notification dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Upload limits.
    #[must_use]
    pub fn attachment_policy(&self) -> &AttachmentPolicy {
        self.env.attachment_policy()
    }

    /// Raise a new ticket in status `new`.
    ///
    /// # Errors
    ///
    /// [`TicketError::Validation`] when title or description is missing.
    #[tracing::instrument(skip(self, actor, draft), fields(actor = %actor.id))]
    pub async fn create(&self, actor: &Actor, draft: TicketDraft) -> Result<Ticket> {
        draft.validate()?;
        let ticket = self
            .store
            .create_ticket(actor.id, draft, self.env.clock().now())
            .await?;

        metrics::ticket_created();
        tracing::info!(ticket_id = %ticket.id, number = %ticket.number, "Ticket created");

        self.dispatcher.dispatch(
            &TicketEvent::NewTicket {
                author: actor.clone(),
            },
            &ticket,
            None,
        );
        Ok(ticket)
    }

    /// Tickets visible to `actor` in `mode`, newest activity first.
    ///
    /// # Errors
    ///
    /// [`TicketError::Forbidden`] when an author asks for `all`.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn list(
        &self,
        actor: &Actor,
        mode: ListMode,
        urgent: Option<bool>,
    ) -> Result<Vec<Ticket>> {
        let query = ListQuery::resolve(actor, mode, urgent)?;
        self.store.list_tickets(&query).await
    }

    /// A single ticket.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`] or [`TicketError::Forbidden`].
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn get(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        access::authorize_read(actor, &ticket)?;
        Ok(ticket)
    }

    /// Change title, description, steps, url or urgency of a `new` ticket.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`], [`TicketError::Forbidden`] or
    /// [`TicketError::Validation`].
    #[tracing::instrument(skip(self, actor, patch), fields(actor = %actor.id))]
    pub async fn edit(&self, actor: &Actor, id: TicketId, patch: TicketPatch) -> Result<Ticket> {
        let committed = self
            .apply(
                id,
                TicketAction::Edit {
                    actor: actor.clone(),
                    patch,
                },
            )
            .await?;
        Ok(committed.ticket)
    }

    /// Move a ticket to `target`.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`], [`TicketError::InvalidTransition`] or
    /// [`TicketError::Forbidden`].
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id, role = %actor.role))]
    pub async fn change_status(
        &self,
        actor: &Actor,
        id: TicketId,
        target: TicketStatus,
    ) -> Result<Ticket> {
        let committed = self
            .apply(
                id,
                TicketAction::ChangeStatus {
                    actor: actor.clone(),
                    target,
                },
            )
            .await?;
        Ok(committed.ticket)
    }

    /// Take a ticket. A `new` ticket moves to `in_progress` in the same unit.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`], [`TicketError::AlreadyAssigned`] or
    /// [`TicketError::Forbidden`].
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn assign(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        let committed = self
            .apply(
                id,
                TicketAction::Assign {
                    actor: actor.clone(),
                },
            )
            .await?;
        if !committed.messages.is_empty() {
            metrics::status_transition(TicketStatus::New, TicketStatus::InProgress);
        }
        Ok(committed.ticket)
    }

    /// Set or clear the urgency tag.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`] or [`TicketError::Forbidden`].
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn set_urgent(&self, actor: &Actor, id: TicketId, urgent: bool) -> Result<Ticket> {
        let committed = self
            .apply(
                id,
                TicketAction::SetUrgent {
                    actor: actor.clone(),
                    urgent,
                },
            )
            .await?;
        Ok(committed.ticket)
    }

    /// Post a message, optionally with one file.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`], [`TicketError::Forbidden`],
    /// [`TicketError::Conflict`] for a closed ticket, and the upload errors
    /// of [`AttachmentPolicy::check`].
    #[tracing::instrument(skip(self, actor, text, upload), fields(actor = %actor.id))]
    pub async fn send_message(
        &self,
        actor: &Actor,
        id: TicketId,
        text: String,
        upload: Option<Upload>,
    ) -> Result<MessageView> {
        let attachment = match upload {
            Some(upload) => {
                let ticket = self.load(id).await?;
                access::authorize_message(actor, &ticket)?;
                Some(self.store_upload(actor, &ticket, upload).await?)
            }
            None => None,
        };
        let reference = attachment.as_ref().map(|a| a.reference.clone());

        let action = TicketAction::PostMessage {
            actor: actor.clone(),
            text,
            attachment,
        };
        let mut committed = match self.apply(id, action).await {
            Ok(committed) => committed,
            Err(error) => {
                self.discard_blob(reference.as_ref()).await;
                return Err(error);
            }
        };

        let message = committed
            .messages
            .pop()
            .ok_or_else(|| TicketError::Storage("message was not persisted".to_string()))?;
        Ok(MessageView {
            message,
            files: committed.attachments,
        })
    }

    /// The conversation of a ticket, oldest first.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`] or [`TicketError::Forbidden`].
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn list_messages(&self, actor: &Actor, id: TicketId) -> Result<Vec<MessageView>> {
        let ticket = self.load(id).await?;
        access::authorize_read(actor, &ticket)?;

        let messages = self.store.list_messages(id).await?;
        let attachments = self.store.message_attachments(id).await?;
        Ok(MessageView::join(messages, &attachments))
    }

    /// Attach a file to a ticket.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`], [`TicketError::Forbidden`],
    /// [`TicketError::DisallowedFileType`] or [`TicketError::PayloadTooLarge`].
    #[tracing::instrument(skip(self, actor, upload), fields(actor = %actor.id, filename = %upload.filename))]
    pub async fn add_attachment(
        &self,
        actor: &Actor,
        id: TicketId,
        upload: Upload,
    ) -> Result<Attachment> {
        let ticket = self.load(id).await?;
        access::authorize_upload(actor, &ticket)?;
        let attachment = self.store_upload(actor, &ticket, upload).await?;
        let reference = attachment.reference.clone();

        let action = TicketAction::AttachFile {
            actor: actor.clone(),
            attachment,
        };
        let mut committed = match self.apply(id, action).await {
            Ok(committed) => committed,
            Err(error) => {
                self.discard_blob(Some(&reference)).await;
                return Err(error);
            }
        };
        committed
            .attachments
            .pop()
            .ok_or_else(|| TicketError::Storage("attachment was not persisted".to_string()))
    }

    /// Resolve a stored reference to its record and bytes, checking read
    /// access on the owning ticket.
    ///
    /// # Errors
    ///
    /// [`TicketError::Forbidden`] for references escaping the storage root or
    /// tickets the actor may not read, [`TicketError::NotFound`] for unknown
    /// references.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn fetch_attachment(
        &self,
        actor: &Actor,
        reference: &str,
    ) -> Result<(Attachment, Vec<u8>)> {
        let reference = StoredReference::parse(reference)?;
        let attachment = self
            .store
            .find_attachment(&reference)
            .await?
            .ok_or_else(|| TicketError::NotFound {
                entity: "file",
                id: reference.to_string(),
            })?;

        let ticket = self.load(attachment.ticket_id).await?;
        access::authorize_read(actor, &ticket)?;

        let bytes = self.blobs.get(&attachment.reference).await?;
        Ok((attachment, bytes))
    }

    /// Attach author, assignee and files to a ticket.
    ///
    /// # Errors
    ///
    /// [`TicketError::Storage`] if the store fails.
    pub async fn ticket_view(&self, ticket: Ticket) -> Result<TicketView> {
        let author = self.store.get_user(ticket.author_id).await?;
        let assignee = match ticket.assignee_id {
            Some(id) => self.store.get_user(id).await?,
            None => None,
        };
        let files = self.store.ticket_attachments(ticket.id).await?;
        Ok(TicketView {
            ticket,
            author,
            assignee,
            files,
        })
    }

    /// [`ticket_view`](Self::ticket_view) for many tickets, keeping order.
    ///
    /// # Errors
    ///
    /// [`TicketError::Storage`] if the store fails.
    pub async fn ticket_views(&self, tickets: Vec<Ticket>) -> Result<Vec<TicketView>> {
        let mut views = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            views.push(self.ticket_view(ticket).await?);
        }
        Ok(views)
    }

    async fn load(&self, id: TicketId) -> Result<Ticket> {
        self.store
            .get_ticket(id)
            .await?
            .ok_or_else(|| TicketError::ticket_not_found(id))
    }

    /// Reduce `action` against the locked ticket, persist, then notify.
    async fn apply(&self, id: TicketId, action: TicketAction) -> Result<Committed> {
        let name = action.name();
        let reducer = self.reducer;
        let env = self.env.clone();

        let result = self
            .store
            .modify_ticket(
                id,
                Box::new(move |ticket| {
                    reducer
                        .reduce(ticket, action, &env)
                        .map(Changes::from_effects)
                }),
            )
            .await;

        let committed = match result {
            Ok(committed) => committed,
            Err(error) => {
                tracing::debug!(ticket_id = %id, action = name, error = %error, "Action rejected");
                return Err(error);
            }
        };

        tracing::info!(
            ticket_id = %id,
            action = name,
            status = %committed.ticket.status,
            "Ticket updated"
        );
        record_metrics(&committed);
        self.notify(&committed).await;
        Ok(committed)
    }

    async fn notify(&self, committed: &Committed) {
        if committed.events.is_empty() {
            return;
        }
        let author = self.author_of(&committed.ticket).await;
        for event in &committed.events {
            self.dispatcher
                .dispatch(event, &committed.ticket, author.as_ref());
        }
    }

    async fn author_of(&self, ticket: &Ticket) -> Option<User> {
        match self.store.get_user(ticket.author_id).await {
            Ok(user) => user,
            Err(error) => {
                tracing::warn!(
                    ticket_id = %ticket.id,
                    error = %error,
                    "Could not load ticket author for notifications"
                );
                None
            }
        }
    }

    /// Check an upload against the policy and write its bytes.
    async fn store_upload(
        &self,
        actor: &Actor,
        ticket: &Ticket,
        upload: Upload,
    ) -> Result<NewAttachment> {
        self.attachment_policy()
            .check(&upload.filename, upload.size())?;

        let reference = StoredReference::generate(ticket.id, &upload.filename);
        self.blobs.put(&reference, &upload.bytes).await?;

        Ok(NewAttachment {
            ticket_id: ticket.id,
            filesize: upload.size(),
            filename: upload.filename,
            reference,
            uploaded_by: actor.id,
            uploaded_at: self.env.clock().now(),
        })
    }

    async fn discard_blob(&self, reference: Option<&StoredReference>) {
        let Some(reference) = reference else {
            return;
        };
        if let Err(error) = self.blobs.delete(reference).await {
            tracing::warn!(reference = %reference, error = %error, "Could not remove orphaned blob");
        }
    }
}

impl std::fmt::Debug for TicketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketRegistry")
            .field("dispatcher", &self.dispatcher)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// Build the actor for `user_id` from the store.
///
/// # Errors
///
/// [`TicketError::NotFound`] if the user does not exist.
pub async fn load_actor(store: &dyn HelpdeskStore, user_id: UserId) -> Result<Actor> {
    store
        .get_user(user_id)
        .await?
        .map(|user| Actor::from(&user))
        .ok_or_else(|| TicketError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })
}

fn record_metrics(committed: &Committed) {
    for event in &committed.events {
        match event {
            TicketEvent::StatusChanged { from, to, .. } => metrics::status_transition(*from, *to),
            TicketEvent::Assigned { .. } => metrics::assignment(),
            TicketEvent::NewMessage { .. } => metrics::message_sent(),
            TicketEvent::NewTicket { .. } | TicketEvent::Urgent { .. } => {}
        }
    }
    for _ in &committed.attachments {
        metrics::attachment_uploaded();
    }
}
