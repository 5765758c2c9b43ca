use super::templates::{self, NotificationContext};
use super::{Notification, NotificationSink};
use crate::metrics;
use helpdesk_core::events::TicketEvent;
use helpdesk_core::{RoleDirectory, Ticket, User};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Errors from dispatcher lifecycle operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// Deliveries were still running when the shutdown timeout expired
    #[error("shutdown timeout: {0} notification tasks still running")]
    ShutdownTimeout(usize),
}

/// Fire-and-forget delivery of lifecycle events.
///
/// [`dispatch`](Self::dispatch) spawns one background task per event and
/// returns immediately. Each notification is attempted exactly once; a
/// failure is logged at `warn` and the remaining recipients are still tried.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Option<Arc<dyn NotificationSink>>,
    roles: Arc<RoleDirectory>,
    webapp_url: Option<String>,
    pending: Arc<AtomicUsize>,
}

impl NotificationDispatcher {
    /// Dispatcher delivering through `sink`.
    #[must_use]
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        roles: Arc<RoleDirectory>,
        webapp_url: Option<String>,
    ) -> Self {
        Self {
            sink: Some(sink),
            roles,
            webapp_url,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Dispatcher that drops every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            sink: None,
            roles: Arc::new(RoleDirectory::default()),
            webapp_url: None,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Notifications `event` would cause, without sending anything.
    #[must_use]
    pub fn plan(&self, event: &TicketEvent, ticket: &Ticket, author: Option<&User>) -> Vec<Notification> {
        templates::plan(
            NotificationContext {
                roles: &self.roles,
                webapp_url: self.webapp_url.as_deref(),
            },
            event,
            ticket,
            author,
        )
    }

    /// Schedule delivery of `event` in the background.
    ///
    /// Outside a Tokio runtime the event is logged and dropped.
    pub fn dispatch(&self, event: &TicketEvent, ticket: &Ticket, author: Option<&User>) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let notifications = self.plan(event, ticket, author);
        if notifications.is_empty() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(event = event.name(), "No async runtime, dropping notifications");
            return;
        };

        let guard = PendingGuard::new(&self.pending);
        runtime.spawn(async move {
            let _guard = guard;
            for notification in notifications {
                deliver(sink.as_ref(), &notification).await;
            }
        });
    }

    /// Number of background deliveries still running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait for running deliveries to finish.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ShutdownTimeout`] if deliveries are still
    /// running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), DispatchError> {
        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(50);

        loop {
            let pending = self.pending();
            if pending == 0 {
                tracing::info!("All notifications delivered");
                return Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::error!(pending, "Shutdown timeout with notifications in flight");
                return Err(DispatchError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("enabled", &self.sink.is_some())
            .field("webapp_url", &self.webapp_url)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

async fn deliver(sink: &dyn NotificationSink, notification: &Notification) {
    match sink.send(notification).await {
        Ok(()) => metrics::notification_sent(notification.event),
        Err(error) => {
            metrics::notification_failed(notification.event);
            tracing::warn!(
                recipient = %notification.recipient,
                ticket_id = %notification.ticket_id,
                event = notification.event,
                error = %error,
                "Notification delivery failed"
            );
        }
    }
}

struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
