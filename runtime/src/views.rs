//! Read models returned by the registry.

use helpdesk_core::attachment::Attachment;
use helpdesk_core::conversation::Message;
use helpdesk_core::{Ticket, User};

/// A ticket together with the people and files it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketView {
    /// The ticket
    pub ticket: Ticket,
    /// Its author, if the user record exists
    pub author: Option<User>,
    /// Its assignee, if any
    pub assignee: Option<User>,
    /// Ticket-level attachments in upload order
    pub files: Vec<Attachment>,
}

/// A conversation entry with its attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    /// The entry
    pub message: Message,
    /// Files sent with it
    pub files: Vec<Attachment>,
}

impl MessageView {
    /// Pair each message with the attachments that reference it.
    #[must_use]
    pub fn join(messages: Vec<Message>, attachments: &[Attachment]) -> Vec<Self> {
        messages
            .into_iter()
            .map(|message| {
                let files = attachments
                    .iter()
                    .filter(|a| a.message_id == Some(message.id))
                    .cloned()
                    .collect();
                Self { message, files }
            })
            .collect()
    }
}
