//! Wiring: turn a [`Config`] into a ready-to-serve router.

use crate::config::Config;
use anyhow::Context;
use axum::Router;
use helpdesk_auth::{Authenticator, InitDataValidator, TokenIssuer};
use helpdesk_core::RoleDirectory;
use helpdesk_core::attachment::AttachmentPolicy;
use helpdesk_core::environment::{Clock, SystemClock};
use helpdesk_postgres::PostgresStore;
use helpdesk_runtime::metrics::MetricsExporter;
use helpdesk_runtime::{
    FsBlobStore, HelpdeskStore, InMemoryStore, LogSink, NotificationDispatcher, NotificationSink,
    TelegramSink, TicketRegistry,
};
use helpdesk_web::AppState;
use std::sync::Arc;

/// A wired application.
pub struct Application {
    /// HTTP routes with all layers applied
    pub router: Router,
    /// The registry behind the routes, kept for shutdown
    pub registry: TicketRegistry,
}

impl Application {
    /// Wait for in-flight notifications, up to `timeout`.
    pub async fn drain(&self, timeout: std::time::Duration) {
        if let Err(e) = self.registry.dispatcher().shutdown(timeout).await {
            tracing::warn!(error = %e, "Notifications still in flight at shutdown");
        }
    }
}

/// Connect the store, pick the notification sink and build the router.
///
/// # Errors
///
/// Fails if the database cannot be reached or migrated, or the Telegram
/// client cannot be built.
pub async fn build(config: &Config, metrics: Option<MetricsExporter>) -> anyhow::Result<Application> {
    let store = open_store(config).await?;
    let roles = Arc::new(RoleDirectory::new(
        config.roles.admin_ids.iter().copied(),
        config.roles.support_ids.iter().copied(),
    ));
    tracing::info!(
        admins = config.roles.admin_ids.len(),
        support = config.roles.support_ids.len(),
        "Role directory loaded"
    );

    let sink: Arc<dyn NotificationSink> = match &config.telegram.bot_token {
        Some(token) => Arc::new(TelegramSink::new(token).context("building Telegram client")?),
        None => {
            tracing::warn!("BOT_TOKEN not set, notifications will only be logged");
            Arc::new(LogSink)
        }
    };
    let dispatcher = NotificationDispatcher::new(
        sink,
        Arc::clone(&roles),
        config.telegram.webapp_url.clone(),
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let policy = AttachmentPolicy::new(
        config.uploads.max_file_size,
        &config.uploads.forbidden_extensions,
    );
    let registry = TicketRegistry::new(
        Arc::clone(&store),
        Arc::new(FsBlobStore::new(config.uploads.dir.clone())),
        dispatcher,
        Arc::clone(&clock),
        policy,
    );

    let tokens = match &config.auth.jwt_secret {
        Some(secret) => TokenIssuer::new(secret.as_bytes(), config.auth.token_ttl),
        None => TokenIssuer::with_random_secret(config.auth.token_ttl),
    };
    let validator = InitDataValidator::new(
        config.telegram.bot_token.clone().unwrap_or_default(),
        config.auth.init_data_max_age,
    );
    let auth = Authenticator::new(Arc::new(validator), tokens, roles, store, clock);

    let mut state = AppState::new(registry.clone(), Arc::new(auth));
    if let Some(exporter) = metrics {
        state = state.with_metrics(exporter);
    }

    Ok(Application {
        router: helpdesk_web::router(state),
        registry,
    })
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn HelpdeskStore>> {
    match &config.database {
        Some(database) => {
            let store = PostgresStore::connect(&database.url, database.max_connections)
                .await
                .context("connecting to PostgreSQL")?;
            store.migrate().await.context("running migrations")?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, tickets are kept in memory only");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
