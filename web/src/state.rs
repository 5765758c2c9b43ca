//! Shared state of the HTTP handlers.

use helpdesk_auth::Authenticator;
use helpdesk_runtime::TicketRegistry;
use helpdesk_runtime::metrics::MetricsExporter;
use std::sync::Arc;

/// Everything a handler may need, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Ticket operations
    pub registry: TicketRegistry,
    /// Login and bearer token resolution
    pub auth: Arc<Authenticator>,
    /// Prometheus exporter; `/metrics` answers 404 without one
    pub metrics: Option<MetricsExporter>,
}

impl AppState {
    /// State without a metrics exporter.
    #[must_use]
    pub fn new(registry: TicketRegistry, auth: Arc<Authenticator>) -> Self {
        Self {
            registry,
            auth,
            metrics: None,
        }
    }

    /// Serve `exporter` on `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, exporter: MetricsExporter) -> Self {
        self.metrics = Some(exporter);
        self
    }

    /// Largest accepted request body: one maximal attachment plus room for
    /// the other multipart fields.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        let max = self.registry.attachment_policy().max_size();
        usize::try_from(max)
            .unwrap_or(usize::MAX)
            .saturating_add(BODY_OVERHEAD)
    }
}

/// Allowance on top of the attachment limit.
pub const BODY_OVERHEAD: usize = 1024 * 1024;
