//! Test doubles for authentication.
//!
//! Enabled with the `test-utils` feature.

use crate::error::{AuthError, Result};
use crate::provider::IdentityProvider;
use crate::telegram::{ExternalIdentity, data_check_string, sign};
use chrono::{DateTime, Utc};
use helpdesk_core::ExternalId;

/// Build init data for `user_json` signed the way Telegram signs it.
///
/// Returns an empty string if signing fails, which every validator rejects.
#[must_use]
pub fn signed_init_data(bot_token: &str, user_json: &str, auth_date: i64) -> String {
    let mut fields = vec![
        ("auth_date".to_string(), auth_date.to_string()),
        ("query_id".to_string(), "AAHdF6IQAAAAAN0XohDhrOrc".to_string()),
        ("user".to_string(), user_json.to_string()),
    ];
    let Ok(hash) = sign(bot_token, &data_check_string(&mut fields)) else {
        return String::new();
    };
    fields.push(("hash".to_string(), hash));
    serde_urlencoded::to_string(&fields).unwrap_or_default()
}

/// Provider that trusts credentials of the form `"<external id>:<name>"`.
///
/// A name starting with `@` becomes the username as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentityProvider;

impl IdentityProvider for StaticIdentityProvider {
    fn identify(&self, credential: &str, _now: DateTime<Utc>) -> Result<ExternalIdentity> {
        let (id, name) = credential
            .split_once(':')
            .ok_or_else(|| AuthError::Malformed("expected <id>:<name>".into()))?;
        let external_id: ExternalId = id
            .parse()
            .map_err(|_| AuthError::Malformed(format!("bad id {id}")))?;
        let username = name.strip_prefix('@').map(str::to_string);
        Ok(ExternalIdentity {
            external_id,
            display_name: username.clone().unwrap_or_else(|| name.to_string()),
            username,
        })
    }
}
