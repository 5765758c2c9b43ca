//! Ticket status and the transition table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a ticket.
///
/// There is no terminal state: `Closed` can be reopened and `Reopened` goes
/// back to work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Raised, nobody has picked it up yet
    New,
    /// Being worked on by support
    InProgress,
    /// Work suspended
    OnPause,
    /// Waiting for the business side (the author) to confirm
    BizReview,
    /// Done
    Closed,
    /// Closed ticket brought back by its author or staff
    Reopened,
}

impl TicketStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::InProgress,
        Self::OnPause,
        Self::BizReview,
        Self::Closed,
        Self::Reopened,
    ];

    /// Statuses reachable from `self` in one step, regardless of who asks.
    #[must_use]
    pub const fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::New => &[Self::InProgress],
            Self::InProgress => &[Self::OnPause, Self::BizReview, Self::Closed],
            Self::OnPause => &[Self::InProgress],
            Self::BizReview => &[Self::InProgress, Self::Closed],
            Self::Closed => &[Self::Reopened],
            Self::Reopened => &[Self::InProgress],
        }
    }

    /// Whether the transition table contains `self → target`.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::OnPause => "on_pause",
            Self::BizReview => "biz_review",
            Self::Closed => "closed",
            Self::Reopened => "reopened",
        }
    }

    /// Human-readable label shown in system messages and notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "Новое",
            Self::InProgress => "В работе",
            Self::OnPause => "На паузе",
            Self::BizReview => "Проверка бизнесом",
            Self::Closed => "Закрытое",
            Self::Reopened => "Переоткрытое",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string outside the six defined values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ticket status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
