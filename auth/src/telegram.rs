//! Telegram WebApp `initData` validation.
//!
//! The Mini App receives a URL-encoded query signed by Telegram. The signature
//! key is derived from the bot token:
//!
//! ```text
//! secret   = HMAC-SHA256(key = "WebAppData", msg = bot_token)
//! expected = hex(HMAC-SHA256(key = secret, msg = data_check_string))
//! ```
//!
//! where `data_check_string` is every field except `hash`, as `key=value`,
//! sorted by key and joined by `\n`.

use crate::error::{AuthError, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use helpdesk_core::ExternalId;
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Who Telegram says the user is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Telegram user id
    pub external_id: ExternalId,
    /// Telegram `@username`, if set
    pub username: Option<String>,
    /// `"first last"`, falling back to the username, then the id
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct TelegramUser {
    id: i64,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    username: Option<String>,
}

impl From<TelegramUser> for ExternalIdentity {
    fn from(user: TelegramUser) -> Self {
        let full_name = format!("{} {}", user.first_name, user.last_name)
            .trim()
            .to_string();
        let display_name = if full_name.is_empty() {
            user.username
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| user.id.to_string())
        } else {
            full_name
        };
        Self {
            external_id: ExternalId(user.id),
            username: user.username,
            display_name,
        }
    }
}

/// Validates init data for one bot.
#[derive(Clone)]
pub struct InitDataValidator {
    bot_token: String,
    max_age: Option<Duration>,
}

impl InitDataValidator {
    /// Validator for `bot_token`. A `max_age` of `None` skips the
    /// `auth_date` freshness check.
    #[must_use]
    pub fn new(bot_token: impl Into<String>, max_age: Option<Duration>) -> Self {
        Self {
            bot_token: bot_token.into(),
            max_age,
        }
    }

    /// Check the signature (and freshness, if configured) of `init_data`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Malformed`] if the query or the `user` JSON cannot be parsed
    /// - [`AuthError::MissingHash`] / [`AuthError::MissingUser`]
    /// - [`AuthError::InvalidSignature`] on a hash mismatch
    /// - [`AuthError::Stale`] if `auth_date` is too old
    pub fn validate(&self, init_data: &str, now: DateTime<Utc>) -> Result<ExternalIdentity> {
        let mut fields: Vec<(String, String)> = serde_urlencoded::from_str(init_data)
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        let hash_at = fields
            .iter()
            .position(|(key, _)| key == "hash")
            .ok_or(AuthError::MissingHash)?;
        let (_, received) = fields.remove(hash_at);

        let user = fields
            .iter()
            .find(|(key, _)| key == "user")
            .map(|(_, value)| value.clone())
            .ok_or(AuthError::MissingUser)?;

        let expected = sign(&self.bot_token, &data_check_string(&mut fields))?;
        if !constant_time_eq::constant_time_eq(expected.as_bytes(), received.as_bytes()) {
            return Err(AuthError::InvalidSignature);
        }

        if let Some(max_age) = self.max_age {
            check_freshness(&fields, max_age, now)?;
        }

        let user: TelegramUser =
            serde_json::from_str(&user).map_err(|e| AuthError::Malformed(e.to_string()))?;
        Ok(user.into())
    }
}

impl std::fmt::Debug for InitDataValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitDataValidator")
            .field("bot_token", &"<redacted>")
            .field("max_age", &self.max_age)
            .finish()
    }
}

/// Validate `init_data` against `bot_token` without a freshness check.
///
/// # Errors
///
/// See [`InitDataValidator::validate`].
pub fn validate_init_data(init_data: &str, bot_token: &str) -> Result<ExternalIdentity> {
    InitDataValidator::new(bot_token, None).validate(init_data, Utc::now())
}

/// Sort fields by key and join them as `key=value` lines.
pub(crate) fn data_check_string(fields: &mut [(String, String)]) -> String {
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hex HMAC of `data_check_string` under the key derived from `bot_token`.
pub(crate) fn sign(bot_token: &str, data_check_string: &str) -> Result<String> {
    let mut derive = HmacSha256::new_from_slice(b"WebAppData")
        .map_err(|e| AuthError::Malformed(e.to_string()))?;
    derive.update(bot_token.as_bytes());
    let secret = derive.finalize().into_bytes();

    let mut mac =
        HmacSha256::new_from_slice(&secret).map_err(|e| AuthError::Malformed(e.to_string()))?;
    mac.update(data_check_string.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn check_freshness(fields: &[(String, String)], max_age: Duration, now: DateTime<Utc>) -> Result<()> {
    let auth_date = fields
        .iter()
        .find(|(key, _)| key == "auth_date")
        .and_then(|(_, value)| value.parse::<i64>().ok())
        .ok_or(AuthError::Stale)?;

    let age = now.timestamp().saturating_sub(auth_date);
    let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    if age > max_age {
        tracing::debug!(age, max_age, "Rejecting stale initData");
        return Err(AuthError::Stale);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::mocks::signed_init_data;

    const BOT_TOKEN: &str = "123456:TEST-TOKEN";

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap()
    }

    #[test]
    fn accepts_a_correctly_signed_payload() {
        let init_data = signed_init_data(
            BOT_TOKEN,
            r#"{"id":42,"first_name":"Olga","last_name":"Petrova","username":"olga"}"#,
            now().timestamp(),
        );
        let identity = validate_init_data(&init_data, BOT_TOKEN).unwrap();
        assert_eq!(identity.external_id, ExternalId(42));
        assert_eq!(identity.display_name, "Olga Petrova");
        assert_eq!(identity.username.as_deref(), Some("olga"));
    }

    #[test]
    fn display_name_falls_back_to_username_then_id() {
        let with_username = signed_init_data(BOT_TOKEN, r#"{"id":7,"username":"ivan"}"#, 0);
        assert_eq!(
            validate_init_data(&with_username, BOT_TOKEN).unwrap().display_name,
            "ivan"
        );

        let bare = signed_init_data(BOT_TOKEN, r#"{"id":7}"#, 0);
        assert_eq!(validate_init_data(&bare, BOT_TOKEN).unwrap().display_name, "7");
    }

    #[test]
    fn wrong_bot_token_is_rejected() {
        let init_data = signed_init_data("other:token", r#"{"id":42}"#, 0);
        assert_eq!(
            validate_init_data(&init_data, BOT_TOKEN),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_user_is_rejected() {
        let init_data = signed_init_data(BOT_TOKEN, r#"{"id":42}"#, 0).replace("42", "43");
        assert_eq!(
            validate_init_data(&init_data, BOT_TOKEN),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn missing_fields_are_reported() {
        assert_eq!(
            validate_init_data("user=%7B%7D", BOT_TOKEN),
            Err(AuthError::MissingHash)
        );
        assert_eq!(
            validate_init_data("auth_date=1&hash=abc", BOT_TOKEN),
            Err(AuthError::MissingUser)
        );
    }

    #[test]
    fn freshness_is_enforced_when_configured() {
        let validator = InitDataValidator::new(BOT_TOKEN, Some(Duration::from_secs(60)));
        let fresh = signed_init_data(BOT_TOKEN, r#"{"id":1}"#, now().timestamp() - 30);
        let stale = signed_init_data(BOT_TOKEN, r#"{"id":1}"#, now().timestamp() - 120);

        assert!(validator.validate(&fresh, now()).is_ok());
        assert_eq!(validator.validate(&stale, now()), Err(AuthError::Stale));
    }

    #[test]
    fn data_check_string_is_sorted() {
        let mut fields = vec![
            ("user".to_string(), "u".to_string()),
            ("auth_date".to_string(), "1".to_string()),
            ("query_id".to_string(), "q".to_string()),
        ];
        assert_eq!(
            data_check_string(&mut fields),
            "auth_date=1\nquery_id=q\nuser=u"
        );
    }
}
