//! Identifier newtypes shared by every crate in the workspace.
//!
//! Store-assigned identifiers are 64-bit integers that grow monotonically with
//! insertion order. Message ordering relies on that property to break ties
//! between entries created at the same instant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Get the raw identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Internal, stable identifier of a user.
    UserId
);

id_newtype!(
    /// Identifier a user carries at the identity provider (a Telegram user id).
    ///
    /// Role membership is configured in terms of these.
    ExternalId
);

id_newtype!(
    /// Identifier of a ticket.
    TicketId
);

id_newtype!(
    /// Identifier of a conversation log entry.
    MessageId
);

id_newtype!(
    /// Identifier of an attachment record.
    AttachmentId
);
