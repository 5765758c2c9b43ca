//! Row types and their conversion into domain values.

use chrono::{DateTime, Utc};
use helpdesk_core::attachment::{Attachment, StoredReference};
use helpdesk_core::conversation::Message;
use helpdesk_core::{
    AttachmentId, ExternalId, MessageId, Ticket, TicketId, User, UserId,
};
use helpdesk_runtime::StoreError;
use sqlx::FromRow;

pub(crate) const USER_COLUMNS: &str = "id, external_id, username, display_name, role, created_at";

pub(crate) const TICKET_COLUMNS: &str = "id, number, author_id, assignee_id, status, is_urgent, \
     title, description, steps, url, created_at, updated_at";

pub(crate) const MESSAGE_COLUMNS: &str = "id, ticket_id, sender_id, sender_role, text, created_at";

pub(crate) const ATTACHMENT_COLUMNS: &str =
    "id, ticket_id, message_id, filename, stored_path, filesize, uploaded_by, uploaded_at";

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    id: i64,
    external_id: i64,
    username: Option<String>,
    display_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId(row.id),
            external_id: ExternalId(row.external_id),
            username: row.username,
            display_name: row.display_name,
            role: row
                .role
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("user {}: {e}", row.id)))?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TicketRow {
    id: i64,
    number: String,
    author_id: i64,
    assignee_id: Option<i64>,
    status: String,
    is_urgent: bool,
    title: String,
    description: String,
    steps: Option<String>,
    url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TicketId(row.id),
            number: row.number,
            author_id: UserId(row.author_id),
            assignee_id: row.assignee_id.map(UserId),
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("ticket {}: {e}", row.id)))?,
            is_urgent: row.is_urgent,
            title: row.title,
            description: row.description,
            steps: row.steps,
            url: row.url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct MessageRow {
    id: i64,
    ticket_id: i64,
    sender_id: Option<i64>,
    sender_role: String,
    text: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MessageId(row.id),
            ticket_id: TicketId(row.ticket_id),
            sender_id: row.sender_id.map(UserId),
            sender_role: row
                .sender_role
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("message {}: {e}", row.id)))?,
            text: row.text,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AttachmentRow {
    id: i64,
    ticket_id: i64,
    message_id: Option<i64>,
    filename: String,
    stored_path: String,
    filesize: i64,
    uploaded_by: Option<i64>,
    uploaded_at: DateTime<Utc>,
}

impl TryFrom<AttachmentRow> for Attachment {
    type Error = StoreError;

    fn try_from(row: AttachmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AttachmentId(row.id),
            ticket_id: TicketId(row.ticket_id),
            message_id: row.message_id.map(MessageId),
            filename: row.filename,
            reference: StoredReference::from_stored(row.stored_path),
            filesize: u64::try_from(row.filesize)
                .map_err(|_| StoreError::Corrupt(format!("attachment {}: negative size", row.id)))?,
            uploaded_by: row.uploaded_by.map(UserId),
            uploaded_at: row.uploaded_at,
        })
    }
}

/// Convert every row, failing on the first corrupt one.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
