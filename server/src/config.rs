//! Configuration management for the helpdesk server.
//!
//! Loaded once at startup from environment variables (after `.env`, if
//! present) and passed explicitly to whatever needs it.

use helpdesk_core::ExternalId;
use helpdesk_core::attachment::{DEFAULT_FORBIDDEN_EXTENSIONS, DEFAULT_MAX_FILE_SIZE};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// A variable that is set but unusable.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {var}: {value:?} ({reason})")]
pub struct ConfigError {
    /// Variable name
    pub var: &'static str,
    /// Offending value
    pub value: String,
    /// Why it was refused
    pub reason: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,
    /// `PostgreSQL`; `None` keeps everything in memory
    pub database: Option<DatabaseConfig>,
    /// Attachment storage and limits
    pub uploads: UploadConfig,
    /// Role membership
    pub roles: RoleConfig,
    /// Telegram bot
    pub telegram: TelegramConfig,
    /// Session tokens
    pub auth: AuthConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// How long to wait for in-flight notifications on shutdown
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `PostgreSQL` configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: String,
    /// Pool size
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Attachment configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Blob storage root
    pub dir: PathBuf,
    /// Largest accepted attachment in bytes
    pub max_file_size: u64,
    /// Refused extensions
    pub forbidden_extensions: Vec<String>,
}

/// Role membership by Telegram id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleConfig {
    /// Admins
    pub admin_ids: Vec<ExternalId>,
    /// Support staff
    pub support_ids: Vec<ExternalId>,
}

/// Telegram bot configuration.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TelegramConfig {
    /// Bot token; without one notifications are only logged and no
    /// `initData` validates
    pub bot_token: Option<String>,
    /// Mini App URL used for "open" buttons
    pub webapp_url: Option<String>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("webapp_url", &self.webapp_url)
            .finish()
    }
}

/// Session token configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// HMAC secret; `None` uses a random per-process secret
    pub jwt_secret: Option<String>,
    /// Token lifetime
    pub token_ttl: Duration,
    /// Maximum `initData` age; `None` disables the check
    pub init_data_max_age: Option<Duration>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl", &self.token_ttl)
            .field("init_data_max_age", &self.init_data_max_age)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a variable that is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a variable that is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            }),
            None => None,
        };

        let forbidden_extensions = get("FORBIDDEN_EXTENSIONS").map_or_else(
            || {
                DEFAULT_FORBIDDEN_EXTENSIONS
                    .iter()
                    .map(|ext| (*ext).to_string())
                    .collect()
            },
            |raw| split_list(&raw).map(str::to_string).collect(),
        );

        let init_data_max_age = match parse(&get, "AUTH_INIT_DATA_MAX_AGE", 86_400_u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            server: ServerConfig {
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse(&get, "PORT", 8000)?,
                shutdown_timeout: Duration::from_secs(parse(&get, "SHUTDOWN_TIMEOUT", 30)?),
            },
            database,
            uploads: UploadConfig {
                dir: get("UPLOAD_DIR").map_or_else(|| PathBuf::from("./uploads"), PathBuf::from),
                max_file_size: parse(&get, "MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?,
                forbidden_extensions,
            },
            roles: RoleConfig {
                admin_ids: parse_ids(&get, "ADMIN_IDS")?,
                support_ids: parse_ids(&get, "SUPPORT_IDS")?,
            },
            telegram: TelegramConfig {
                bot_token: get("BOT_TOKEN"),
                webapp_url: get("WEBAPP_URL"),
            },
            auth: AuthConfig {
                jwt_secret: get("AUTH_JWT_SECRET"),
                token_ttl: Duration::from_secs(
                    parse::<u64>(&get, "AUTH_TOKEN_TTL_HOURS", 24)?.saturating_mul(3600),
                ),
                init_data_max_age,
            },
        })
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_ids(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Vec<ExternalId>, ConfigError> {
    let Some(raw) = get(var) else {
        return Ok(Vec::new());
    };
    split_list(&raw)
        .map(|item| {
            item.parse().map_err(|e: std::num::ParseIntError| ConfigError {
                var,
                value: item.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_run_in_memory() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
        assert!(config.database.is_none());
        assert_eq!(config.uploads.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.uploads.forbidden_extensions.len(), 11);
        assert_eq!(config.auth.token_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.auth.init_data_max_age, Some(Duration::from_secs(86_400)));
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn role_lists_are_comma_separated() {
        let config = load(&[("ADMIN_IDS", "1, 2,,"), ("SUPPORT_IDS", "3")]).unwrap();
        assert_eq!(config.roles.admin_ids, vec![ExternalId(1), ExternalId(2)]);
        assert_eq!(config.roles.support_ids, vec![ExternalId(3)]);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = load(&[("SUPPORT_IDS", "3,abc")]).unwrap_err();
        assert_eq!(err.var, "SUPPORT_IDS");
        assert_eq!(err.value, "abc");

        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.var, "PORT");
    }

    #[test]
    fn zero_max_age_disables_the_freshness_check() {
        let config = load(&[("AUTH_INIT_DATA_MAX_AGE", "0")]).unwrap();
        assert_eq!(config.auth.init_data_max_age, None);
    }

    #[test]
    fn database_and_uploads_are_read() {
        let config = load(&[
            ("DATABASE_URL", "postgres://u:p@db/helpdesk"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("UPLOAD_DIR", "/var/lib/helpdesk"),
            ("FORBIDDEN_EXTENSIONS", ".exe, .js"),
        ])
        .unwrap();
        let database = config.database.unwrap();
        assert_eq!(database.max_connections, 4);
        assert!(!format!("{database:?}").contains("u:p"));
        assert_eq!(config.uploads.dir, PathBuf::from("/var/lib/helpdesk"));
        assert_eq!(config.uploads.forbidden_extensions, vec![".exe", ".js"]);
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let config = load(&[("BOT_TOKEN", "123:SECRET"), ("AUTH_JWT_SECRET", "hunter2")]).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("SECRET"));
        assert!(!printed.contains("hunter2"));
    }
}
