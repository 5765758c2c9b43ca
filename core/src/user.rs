//! Users and the actor performing an operation.

use crate::role::Role;
use crate::types::{ExternalId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A known user.
///
/// Created on first successful authentication. The role is re-derived from
/// configuration on every later authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal identifier
    pub id: UserId,
    /// Identifier at the identity provider
    pub external_id: ExternalId,
    /// Handle at the identity provider, if any
    pub username: Option<String>,
    /// Name shown to other users
    pub display_name: String,
    /// Role as of the last authentication
    pub role: Role,
    /// First authentication
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Internal identifier
    pub id: UserId,
    /// Role used for every authorization decision
    pub role: Role,
    /// Notification address
    pub external_id: ExternalId,
    /// Name used in notification texts
    pub display_name: String,
    /// Handle used in notification texts
    pub username: Option<String>,
}

impl Actor {
    /// Whether this actor is support or admin staff.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// `@username` when known, otherwise the display name.
    #[must_use]
    pub fn handle(&self) -> String {
        self.username
            .as_deref()
            .map_or_else(|| self.display_name.clone(), |name| format!("@{name}"))
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            external_id: user.external_id,
            display_name: user.display_name.clone(),
            username: user.username.clone(),
        }
    }
}
