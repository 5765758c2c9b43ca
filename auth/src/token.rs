//! Session tokens (JWT, HS256).

use crate::error::{AuthError, Result};
use chrono::{DateTime, Utc};
use helpdesk_core::{ExternalId, Role, User, UserId};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string
    pub sub: String,
    /// Identity provider id
    pub external_id: i64,
    /// Role at issue time, informational only
    pub role: Role,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

impl Claims {
    /// The user the token was issued to.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] if `sub` is not a user id.
    pub fn user_id(&self) -> Result<UserId> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Issues and verifies session tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Issuer signing with `secret`.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issuer with a random secret. Tokens do not survive a restart.
    #[must_use]
    pub fn with_random_secret(ttl: Duration) -> Self {
        let mut secret = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        tracing::warn!("No token secret configured, sessions will not survive a restart");
        Self::new(&secret, ttl)
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user`, valid for the configured lifetime from `now`.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenIssue`] if signing fails.
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user.id.to_string(),
            external_id: user.external_id.get(),
            role: user.role,
            exp: now.timestamp().saturating_add(ttl),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))
    }

    /// Check signature and expiry as of `now` and return the claims.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] for any malformed, forged or expired token.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        // Expiry is checked against the injected clock, not the system time.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected session token");
                AuthError::InvalidToken
            })?;
        if claims.exp <= now.timestamp() {
            tracing::debug!(exp = claims.exp, "Rejected expired session token");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl From<&Claims> for ExternalId {
    fn from(claims: &Claims) -> Self {
        Self(claims.external_id)
    }
}
