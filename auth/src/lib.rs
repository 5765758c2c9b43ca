//! # Helpdesk Auth
//!
//! Identity for the helpdesk: who is calling, and with which role.
//!
//! Users sign in from the Telegram Mini App by posting the WebApp `initData`
//! string. Its HMAC signature is checked against the bot token, the user is
//! created or refreshed with a role derived from configuration, and a signed
//! session token is returned. Later requests present that token as a bearer
//! credential.
//!
//! ## Example
//!
//! ```ignore
//! let auth = Authenticator::new(
//!     Arc::new(InitDataValidator::new(bot_token, Some(Duration::from_secs(86_400)))),
//!     TokenIssuer::new(secret.as_bytes(), DEFAULT_TOKEN_TTL),
//!     roles,
//!     store,
//!     Arc::new(SystemClock),
//! );
//!
//! let session = auth.login(init_data).await?;
//! let actor = auth.actor(&session.token).await?;
//! ```

pub mod authenticator;
pub mod error;
pub mod provider;
pub mod telegram;
pub mod token;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use authenticator::{Authenticator, Session};
pub use error::{AuthError, Result};
pub use provider::IdentityProvider;
pub use telegram::{ExternalIdentity, InitDataValidator, validate_init_data};
pub use token::{Claims, DEFAULT_TOKEN_TTL, TokenIssuer};
