//! Role model.
//!
//! Roles are a closed set. A user's role is computed from configured
//! membership sets every time they authenticate; it is never accepted from
//! the client.

use crate::types::ExternalId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Raises tickets and talks about their own tickets.
    Author,
    /// Works tickets.
    Support,
    /// Works tickets; same lifecycle rights as support.
    Admin,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Support => "support",
            Self::Admin => "admin",
        }
    }

    /// Support and admin staff share every right in the lifecycle.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Support | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "author" => Ok(Self::Author),
            "support" => Ok(Self::Support),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Role recorded on a conversation entry.
///
/// This is a snapshot taken at send time, not a live reference to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    /// Message written by a ticket author.
    Author,
    /// Message written by support staff.
    Support,
    /// Message written by an admin.
    Admin,
    /// Entry generated by the lifecycle itself.
    System,
}

impl SenderRole {
    /// Wire name of the sender role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Support => "support",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

impl From<Role> for SenderRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Author => Self::Author,
            Role::Support => Self::Support,
            Role::Admin => Self::Admin,
        }
    }
}

impl FromStr for SenderRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            other => Role::from_str(other).map(Self::from),
        }
    }
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured role membership.
///
/// Loaded once at startup and passed explicitly to whoever needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDirectory {
    admins: HashSet<ExternalId>,
    support: HashSet<ExternalId>,
}

impl RoleDirectory {
    /// Build a directory from admin and support membership lists.
    #[must_use]
    pub fn new(
        admins: impl IntoIterator<Item = ExternalId>,
        support: impl IntoIterator<Item = ExternalId>,
    ) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            support: support.into_iter().collect(),
        }
    }

    /// Map an external identity to its role.
    ///
    /// Admin membership wins over support membership, which wins over the
    /// default `author`.
    #[must_use]
    pub fn role_for(&self, external_id: ExternalId) -> Role {
        if self.admins.contains(&external_id) {
            Role::Admin
        } else if self.support.contains(&external_id) {
            Role::Support
        } else {
            Role::Author
        }
    }

    /// Everyone who receives staff-facing notifications, deduplicated and in
    /// a stable order.
    #[must_use]
    pub fn staff_recipients(&self) -> Vec<ExternalId> {
        self.admins
            .iter()
            .chain(self.support.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    fn directory() -> RoleDirectory {
        RoleDirectory::new([ExternalId(1), ExternalId(3)], [ExternalId(2), ExternalId(3)])
    }

    #[test]
    fn admin_wins_over_support() {
        let roles = directory();
        assert_eq!(roles.role_for(ExternalId(1)), Role::Admin);
        assert_eq!(roles.role_for(ExternalId(2)), Role::Support);
        assert_eq!(roles.role_for(ExternalId(3)), Role::Admin);
        assert_eq!(roles.role_for(ExternalId(99)), Role::Author);
    }

    #[test]
    fn staff_recipients_are_deduplicated() {
        assert_eq!(
            directory().staff_recipients(),
            vec![ExternalId(1), ExternalId(2), ExternalId(3)]
        );
    }

    #[test]
    fn unknown_role_strings_are_rejected() {
        assert_eq!("support".parse::<Role>().unwrap(), Role::Support);
        assert!("system".parse::<Role>().is_err());
        assert!("root".parse::<Role>().is_err());
        assert_eq!("system".parse::<SenderRole>().unwrap(), SenderRole::System);
    }

    #[test]
    fn only_support_and_admin_are_staff() {
        assert!(!Role::Author.is_staff());
        assert!(Role::Support.is_staff());
        assert!(Role::Admin.is_staff());
    }
}
