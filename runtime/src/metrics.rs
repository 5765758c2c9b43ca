//! Prometheus metrics for the helpdesk.
//!
//! Counters are recorded through the `metrics` facade. Without an installed
//! recorder they are no-ops, so tests need no setup.
//!
//! # Example
//!
//! ```rust,no_run
//! use helpdesk_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let exporter = MetricsExporter::install()?;
//! let text = exporter.render();
//! # Ok(())
//! # }
//! ```

use helpdesk_core::TicketStatus;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Tickets created.
pub const TICKETS_CREATED: &str = "helpdesk_tickets_created_total";
/// Status transitions, labelled `from` and `to`.
pub const STATUS_TRANSITIONS: &str = "helpdesk_status_transitions_total";
/// Assignments.
pub const ASSIGNMENTS: &str = "helpdesk_assignments_total";
/// Human messages posted.
pub const MESSAGES_SENT: &str = "helpdesk_messages_sent_total";
/// Attachments stored.
pub const ATTACHMENTS_UPLOADED: &str = "helpdesk_attachments_uploaded_total";
/// Notifications delivered, labelled `event`.
pub const NOTIFICATIONS_SENT: &str = "helpdesk_notifications_sent_total";
/// Notifications that failed, labelled `event`.
pub const NOTIFICATIONS_FAILED: &str = "helpdesk_notifications_failed_total";

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install the Prometheus recorder
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installed Prometheus recorder.
#[derive(Clone)]
pub struct MetricsExporter {
    handle: PrometheusHandle,
}

impl MetricsExporter {
    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if a recorder is already installed.
    pub fn install() -> Result<Self, MetricsError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;
        register_metrics();
        tracing::info!("Metrics recorder installed");
        Ok(Self { handle })
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsExporter").finish_non_exhaustive()
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(TICKETS_CREATED, "Total number of tickets created");
    describe_counter!(
        STATUS_TRANSITIONS,
        "Total number of ticket status transitions"
    );
    describe_counter!(ASSIGNMENTS, "Total number of ticket assignments");
    describe_counter!(MESSAGES_SENT, "Total number of conversation messages sent");
    describe_counter!(
        ATTACHMENTS_UPLOADED,
        "Total number of attachments uploaded"
    );
    describe_counter!(
        NOTIFICATIONS_SENT,
        "Total number of notifications delivered"
    );
    describe_counter!(
        NOTIFICATIONS_FAILED,
        "Total number of notifications that failed"
    );
}

pub(crate) fn ticket_created() {
    counter!(TICKETS_CREATED).increment(1);
}

pub(crate) fn status_transition(from: TicketStatus, to: TicketStatus) {
    counter!(STATUS_TRANSITIONS, "from" => from.as_str(), "to" => to.as_str()).increment(1);
}

pub(crate) fn assignment() {
    counter!(ASSIGNMENTS).increment(1);
}

pub(crate) fn message_sent() {
    counter!(MESSAGES_SENT).increment(1);
}

pub(crate) fn attachment_uploaded() {
    counter!(ATTACHMENTS_UPLOADED).increment(1);
}

pub(crate) fn notification_sent(event: &'static str) {
    counter!(NOTIFICATIONS_SENT, "event" => event).increment(1);
}

pub(crate) fn notification_failed(event: &'static str) {
    counter!(NOTIFICATIONS_FAILED, "event" => event).increment(1);
}
