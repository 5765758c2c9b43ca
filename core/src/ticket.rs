//! The ticket entity and its input shapes.

use crate::error::{Result, TicketError};
use crate::status::TicketStatus;
use crate::types::{TicketId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A support ticket.
///
/// `author_id` never changes after creation. `assignee_id` is set at most
/// once, through assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Store-assigned identifier
    pub id: TicketId,
    /// Human-readable number, `#<year>-<seq>`
    pub number: String,
    /// Owner of the ticket
    pub author_id: UserId,
    /// Staff member working the ticket
    pub assignee_id: Option<UserId>,
    /// Current lifecycle state
    pub status: TicketStatus,
    /// Urgency tag, independent of status
    pub is_urgent: bool,
    /// Short summary
    pub title: String,
    /// Problem description
    pub description: String,
    /// Steps to reproduce
    pub steps: Option<String>,
    /// Page the problem was seen on
    pub url: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Build a freshly created ticket in status `new`.
    #[must_use]
    pub fn open(
        id: TicketId,
        number: String,
        author_id: UserId,
        draft: TicketDraft,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            number,
            author_id,
            assignee_id: None,
            status: TicketStatus::New,
            is_urgent: draft.is_urgent,
            title: draft.title,
            description: draft.description,
            steps: draft.steps,
            url: draft.url,
            created_at: at,
            updated_at: at,
        }
    }

    /// Whether `user` authored this ticket.
    #[must_use]
    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.author_id == user
    }

    /// Refresh `updated_at`.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Input for creating a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    /// Short summary (required)
    pub title: String,
    /// Problem description (required)
    pub description: String,
    /// Steps to reproduce
    #[serde(default)]
    pub steps: Option<String>,
    /// Page the problem was seen on
    #[serde(default)]
    pub url: Option<String>,
    /// Raise the ticket already tagged urgent
    #[serde(default)]
    pub is_urgent: bool,
}

impl TicketDraft {
    /// Check that title and description are present.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Validation`] if either is blank.
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)
    }
}

/// Field subset an author may change while the ticket is still `new`.
///
/// `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPatch {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// New steps to reproduce
    #[serde(default)]
    pub steps: Option<String>,
    /// New page URL
    #[serde(default)]
    pub url: Option<String>,
    /// New urgency flag (plain field edit, no system message)
    #[serde(default)]
    pub is_urgent: Option<bool>,
}

impl TicketPatch {
    /// Reject a patch that would blank out a required field.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Validation`] for an empty title or description.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(description) = &self.description {
            require_text("description", description)?;
        }
        Ok(())
    }

    /// Copy the present fields onto `ticket`.
    pub fn apply(self, ticket: &mut Ticket) {
        if let Some(title) = self.title {
            ticket.title = title;
        }
        if let Some(description) = self.description {
            ticket.description = description;
        }
        if let Some(steps) = self.steps {
            ticket.steps = Some(steps);
        }
        if let Some(url) = self.url {
            ticket.url = Some(url);
        }
        if let Some(is_urgent) = self.is_urgent {
            ticket.is_urgent = is_urgent;
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TicketError::Validation(format!("{field} is required")));
    }
    Ok(())
}
