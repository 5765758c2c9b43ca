use super::{Notification, NotificationSink, SinkError};
use async_trait::async_trait;

/// Sink that only writes notifications to the log.
///
/// Used when no bot token is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, notification: &Notification) -> Result<(), SinkError> {
        tracing::info!(
            recipient = %notification.recipient,
            ticket_id = %notification.ticket_id,
            event = notification.event,
            text = %notification.text,
            "Notification (log only)"
        );
        Ok(())
    }
}
