//! Request and response bodies.
//!
//! Field names are the ones the Mini App front end already speaks
//! (`initData`, `telegram_id`, `full_name`, `stored_path`).

use chrono::{DateTime, Utc};
use helpdesk_core::access::ListMode;
use helpdesk_core::attachment::Attachment;
use helpdesk_core::{Role, SenderRole, TicketStatus, User};
use helpdesk_runtime::{MessageView, TicketView};
use serde::{Deserialize, Serialize};

/// `POST /auth/telegram` body.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramAuthRequest {
    /// Raw `Telegram.WebApp.initData`
    #[serde(rename = "initData")]
    pub init_data: String,
}

/// `POST /auth/telegram` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token
    pub token: String,
    /// The signed-in user
    pub user: UserOut,
}

/// A user as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOut {
    /// Internal id
    pub id: i64,
    /// Telegram id
    pub telegram_id: i64,
    /// Telegram username
    pub username: Option<String>,
    /// Display name
    pub full_name: String,
    /// Current role
    pub role: Role,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id.get(),
            telegram_id: user.external_id.get(),
            username: user.username,
            full_name: user.display_name,
            role: user.role,
        }
    }
}

/// An attachment as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOut {
    /// Attachment id
    pub id: i64,
    /// Name given by the uploader
    pub filename: String,
    /// Reference to pass to `GET /files/{reference}`
    pub stored_path: String,
    /// Size in bytes
    pub filesize: u64,
}

impl From<Attachment> for FileOut {
    fn from(attachment: Attachment) -> Self {
        Self {
            id: attachment.id.get(),
            filename: attachment.filename,
            stored_path: attachment.reference.as_str().to_string(),
            filesize: attachment.filesize,
        }
    }
}

/// A ticket with its people and files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOut {
    /// Ticket id
    pub id: i64,
    /// `#YYYY-NNN`
    pub number: String,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Urgency tag
    pub is_urgent: bool,
    /// Summary
    pub title: String,
    /// Description
    pub description: String,
    /// Steps to reproduce
    pub steps: Option<String>,
    /// Page the problem was seen on
    pub url: Option<String>,
    /// Author
    pub author: Option<UserOut>,
    /// Assignee
    pub assignee: Option<UserOut>,
    /// Ticket-level attachments
    pub files: Vec<FileOut>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last activity
    pub updated_at: DateTime<Utc>,
}

impl From<TicketView> for TicketOut {
    fn from(view: TicketView) -> Self {
        let TicketView {
            ticket,
            author,
            assignee,
            files,
        } = view;
        Self {
            id: ticket.id.get(),
            number: ticket.number,
            status: ticket.status,
            is_urgent: ticket.is_urgent,
            title: ticket.title,
            description: ticket.description,
            steps: ticket.steps,
            url: ticket.url,
            author: author.map(UserOut::from),
            assignee: assignee.map(UserOut::from),
            files: files.into_iter().map(FileOut::from).collect(),
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

/// A conversation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOut {
    /// Message id
    pub id: i64,
    /// Owning ticket
    pub ticket_id: i64,
    /// Sender, absent for system entries
    pub sender_id: Option<i64>,
    /// Sender role at send time
    pub sender_role: SenderRole,
    /// Body
    pub text: String,
    /// Send time
    pub created_at: DateTime<Utc>,
    /// Files sent with the message
    pub files: Vec<FileOut>,
}

impl From<MessageView> for MessageOut {
    fn from(view: MessageView) -> Self {
        let MessageView { message, files } = view;
        Self {
            id: message.id.get(),
            ticket_id: message.ticket_id.get(),
            sender_id: message.sender_id.map(|id| id.get()),
            sender_role: message.sender_role,
            text: message.text,
            created_at: message.created_at,
            files: files.into_iter().map(FileOut::from).collect(),
        }
    }
}

/// `GET /tickets` query.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListParams {
    /// `all`, `mine` (default) or `closed`
    #[serde(default)]
    pub filter: ListMode,
    /// Only urgent (`true`) or only non-urgent (`false`) tickets
    pub urgent: Option<bool>,
}

/// `PUT /tickets/{id}/status` body.
///
/// The status stays a string so that an unknown value is reported as a
/// refused transition rather than a body parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    /// Target status
    pub status: String,
}

/// `PUT /tickets/{id}/urgent` body.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UrgentUpdate {
    /// New urgency
    pub is_urgent: bool,
}
