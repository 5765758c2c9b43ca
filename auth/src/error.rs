//! Error types for authentication.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Why a credential or session token was refused.
///
/// Every variant except [`AuthError::Storage`] and [`AuthError::TokenIssue`]
/// is the client's fault and maps to `401` at the HTTP boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Init data validation
    // ═══════════════════════════════════════════════════════════
    /// The init data carries no `hash`.
    #[error("Missing hash in initData")]
    MissingHash,

    /// The init data carries no `user`.
    #[error("Missing user field in initData")]
    MissingUser,

    /// The signature does not match the bot token.
    #[error("Invalid initData signature")]
    InvalidSignature,

    /// The init data could not be parsed.
    #[error("Malformed initData: {0}")]
    Malformed(String),

    /// `auth_date` is older than the configured maximum age.
    #[error("initData has expired")]
    Stale,

    // ═══════════════════════════════════════════════════════════
    // Session tokens
    // ═══════════════════════════════════════════════════════════
    /// The bearer token is missing, malformed, badly signed or expired.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token names a user the store does not know.
    #[error("User not found")]
    UnknownUser,

    // ═══════════════════════════════════════════════════════════
    // System errors
    // ═══════════════════════════════════════════════════════════
    /// A token could not be signed.
    #[error("Failed to issue token: {0}")]
    TokenIssue(String),

    /// The user store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Returns `true` if this error is due to the client's credential.
    ///
    /// # Examples
    ///
    /// ```
    /// # use helpdesk_auth::AuthError;
    /// assert!(AuthError::InvalidSignature.is_client_error());
    /// assert!(!AuthError::Storage("down".into()).is_client_error());
    /// ```
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::TokenIssue(_) | Self::Storage(_))
    }

    /// Returns `true` if this error suggests a forged credential.
    ///
    /// # Examples
    ///
    /// ```
    /// # use helpdesk_auth::AuthError;
    /// assert!(AuthError::InvalidSignature.is_security_issue());
    /// assert!(!AuthError::Stale.is_security_issue());
    /// ```
    #[must_use]
    pub const fn is_security_issue(&self) -> bool {
        matches!(self, Self::InvalidSignature)
    }
}

impl From<helpdesk_core::TicketError> for AuthError {
    fn from(error: helpdesk_core::TicketError) -> Self {
        Self::Storage(error.to_string())
    }
}
