//! Login and session resolution.

use crate::error::{AuthError, Result};
use crate::provider::IdentityProvider;
use crate::token::TokenIssuer;
use helpdesk_core::environment::Clock;
use helpdesk_core::{Actor, RoleDirectory, User};
use helpdesk_runtime::{HelpdeskStore, UserUpsert};
use serde::Serialize;
use std::sync::Arc;

/// A successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Bearer token for later requests
    pub token: String,
    /// The user as stored after the login
    pub user: User,
}

/// Turns identity credentials into sessions and sessions back into users.
///
/// Roles come from the [`RoleDirectory`] on every login, so a change to the
/// configured lists takes effect the next time the user signs in.
pub struct Authenticator {
    provider: Arc<dyn IdentityProvider>,
    tokens: TokenIssuer,
    roles: Arc<RoleDirectory>,
    store: Arc<dyn HelpdeskStore>,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    /// Wire an authenticator.
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        tokens: TokenIssuer,
        roles: Arc<RoleDirectory>,
        store: Arc<dyn HelpdeskStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            tokens,
            roles,
            store,
            clock,
        }
    }

    /// Verify `credential`, create or refresh the user and issue a token.
    ///
    /// # Errors
    ///
    /// Whatever the identity provider rejects the credential with, or
    /// [`AuthError::Storage`] / [`AuthError::TokenIssue`].
    pub async fn login(&self, credential: &str) -> Result<Session> {
        let now = self.clock.now();
        let identity = self.provider.identify(credential, now).inspect_err(|e| {
            if e.is_security_issue() {
                tracing::warn!(error = %e, "Login refused");
            } else {
                tracing::debug!(error = %e, "Login refused");
            }
        })?;

        let role = self.roles.role_for(identity.external_id);
        let user = self
            .store
            .upsert_user(UserUpsert {
                external_id: identity.external_id,
                username: identity.username,
                display_name: identity.display_name,
                role,
                at: now,
            })
            .await?;

        let token = self.tokens.issue(&user, now)?;
        tracing::info!(user_id = %user.id, role = %user.role, "User signed in");
        Ok(Session { token, user })
    }

    /// The user a bearer token belongs to.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] for a bad token, [`AuthError::UnknownUser`]
    /// if the user no longer exists.
    pub async fn resolve(&self, token: &str) -> Result<User> {
        let claims = self.tokens.verify(token, self.clock.now())?;
        let id = claims.user_id()?;
        self.store
            .get_user(id)
            .await?
            .ok_or(AuthError::UnknownUser)
    }

    /// The actor a bearer token acts as.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::resolve`].
    pub async fn actor(&self, token: &str) -> Result<Actor> {
        self.resolve(token).await.map(|user| Actor::from(&user))
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("tokens", &self.tokens)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}
