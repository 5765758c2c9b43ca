//! Notification texts and recipients per event.
//!
//! Staff-facing events go to every admin and support member, deduplicated.
//! Author-facing events go to the ticket's author only.

use super::Notification;
use helpdesk_core::events::TicketEvent;
use helpdesk_core::{Actor, ExternalId, RoleDirectory, Ticket, TicketStatus, User};

/// Characters of a message body quoted in a notification.
pub const PREVIEW_CHARS: usize = 100;

/// Everything needed to address and render a notification.
#[derive(Debug, Clone, Copy)]
pub struct NotificationContext<'a> {
    /// Role membership, for staff recipients
    pub roles: &'a RoleDirectory,
    /// Base URL of the web app, for the open link
    pub webapp_url: Option<&'a str>,
}

/// Turn one event into the notifications it causes.
///
/// `author` is the ticket's author; author-facing events are dropped when it
/// is unknown.
#[must_use]
pub fn plan(
    context: NotificationContext<'_>,
    event: &TicketEvent,
    ticket: &Ticket,
    author: Option<&User>,
) -> Vec<Notification> {
    let (audience, text) = match event {
        TicketEvent::NewTicket { author } => (Audience::Staff, new_ticket(ticket, author)),
        TicketEvent::StatusChanged { from, to, .. } => {
            (Audience::Author, status_changed(ticket, *from, *to))
        }
        TicketEvent::Assigned { assignee } => (Audience::Author, assigned(ticket, assignee)),
        TicketEvent::Urgent { .. } => (Audience::Staff, urgent(ticket)),
        TicketEvent::NewMessage { sender, text } if sender.is_staff() => {
            (Audience::Author, staff_message(ticket, text))
        }
        TicketEvent::NewMessage { sender, text } => {
            (Audience::Staff, author_message(ticket, sender, text))
        }
    };

    let recipients: Vec<ExternalId> = match audience {
        Audience::Staff => context.roles.staff_recipients(),
        Audience::Author => author.map(|user| user.external_id).into_iter().collect(),
    };
    let open_url = context.webapp_url.map(|base| open_link(base, ticket));

    recipients
        .into_iter()
        .map(|recipient| Notification {
            recipient,
            text: text.clone(),
            ticket_id: ticket.id,
            open_url: open_url.clone(),
            event: event.name(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Audience {
    Staff,
    Author,
}

/// Deep link opening `ticket` in the web app.
#[must_use]
pub fn open_link(webapp_url: &str, ticket: &Ticket) -> String {
    format!("{webapp_url}?startapp=ticket_{}", ticket.id)
}

fn new_ticket(ticket: &Ticket, author: &Actor) -> String {
    let prefix = if ticket.is_urgent { "🔴 СРОЧНО! " } else { "" };
    format!(
        "{prefix}📋 Новое обращение <b>{}</b>\n<b>{}</b>\nАвтор: {}",
        escape(&ticket.number),
        escape(&ticket.title),
        escape(&author.handle())
    )
}

fn status_changed(ticket: &Ticket, from: TicketStatus, to: TicketStatus) -> String {
    if to == TicketStatus::BizReview {
        format!(
            "⏳ Обращение <b>{}</b> ждёт вашего ответа.\nСтатус: <b>{}</b>\n\
             Пожалуйста, проверьте и закройте или ответьте в чате.",
            escape(&ticket.number),
            TicketStatus::BizReview.label()
        )
    } else {
        format!(
            "🔄 Статус обращения <b>{}</b> изменён\n{} → <b>{}</b>",
            escape(&ticket.number),
            from.label(),
            to.label()
        )
    }
}

fn assigned(ticket: &Ticket, assignee: &Actor) -> String {
    format!(
        "👤 Обращение <b>{}</b> взято в работу\nСпециалист: {}",
        escape(&ticket.number),
        escape(&assignee.display_name)
    )
}

fn urgent(ticket: &Ticket) -> String {
    format!(
        "🔴 СРОЧНО! Обращение <b>{}</b> отмечено как срочное\n<b>{}</b>",
        escape(&ticket.number),
        escape(&ticket.title)
    )
}

fn staff_message(ticket: &Ticket, text: &str) -> String {
    format!(
        "💬 Новое сообщение в обращении <b>{}</b>\nПоддержка: {}",
        escape(&ticket.number),
        escape(&preview(text))
    )
}

fn author_message(ticket: &Ticket, sender: &Actor, text: &str) -> String {
    format!(
        "💬 Новое сообщение от автора в обращении <b>{}</b>\n{}: {}",
        escape(&ticket.number),
        escape(&sender.handle()),
        escape(&preview(text))
    )
}

/// First [`PREVIEW_CHARS`] characters of `text`.
#[must_use]
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Escape user-supplied text for Telegram HTML parse mode.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}
