//! # Helpdesk Testing
//!
//! Testing utilities for the helpdesk crates.
//!
//! This crate provides:
//! - Deterministic clocks
//! - Recording and failing notification sinks
//! - An in-memory blob store
//! - A fully wired [`TestHelpdesk`] with configured staff
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - proptest strategies for lifecycle types
//!
//! ## Example
//!
//! ```ignore
//! use helpdesk_testing::TestHelpdesk;
//!
//! #[tokio::test]
//! async fn support_takes_a_ticket() {
//!     let desk = TestHelpdesk::new();
//!     let author = desk.sign_in(100, "Olga").await;
//!     let support = desk.support().await;
//!
//!     let ticket = desk.registry.create(&author, draft("VPN")).await.unwrap();
//!     let ticket = desk.registry.assign(&support, ticket.id).await.unwrap();
//!     assert_eq!(ticket.status, TicketStatus::InProgress);
//! }
//! ```

pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

use chrono::{DateTime, Duration, TimeZone, Utc};
use helpdesk_core::environment::Clock;

/// Mock implementations of environment traits and collaborators.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use async_trait::async_trait;
    use helpdesk_core::attachment::StoredReference;
    use helpdesk_runtime::{BlobError, BlobStore, Notification, NotificationSink, SinkError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use helpdesk_testing::mocks::FixedClock;
    /// use helpdesk_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves forward by a fixed step on every reading.
    ///
    /// Gives every write a distinct timestamp, so ordering by `updated_at`
    /// is observable in tests.
    #[derive(Debug)]
    pub struct SteppingClock {
        start: DateTime<Utc>,
        step: Duration,
        ticks: AtomicI64,
    }

    impl SteppingClock {
        /// Start at `start`, advancing `step` per call to `now`.
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                start,
                step,
                ticks: AtomicI64::new(0),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            let offset = self.step.checked_mul(i32::try_from(tick).unwrap_or(i32::MAX));
            offset
                .and_then(|offset| self.start.checked_add_signed(offset))
                .unwrap_or(self.start)
        }
    }

    /// Sink that keeps every notification it is asked to send.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingSink {
        /// Create an empty sink.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Everything sent so far, in delivery order.
        pub async fn notifications(&self) -> Vec<Notification> {
            self.sent.lock().await.clone()
        }

        /// Forget everything sent so far.
        pub async fn clear(&self) {
            self.sent.lock().await.clear();
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, notification: &Notification) -> Result<(), SinkError> {
            self.sent.lock().await.push(notification.clone());
            Ok(())
        }
    }

    /// Sink whose every delivery fails.
    #[derive(Debug, Default)]
    pub struct FailingSink {
        attempts: AtomicUsize,
    }

    impl FailingSink {
        /// Create a sink.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of deliveries attempted.
        #[must_use]
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn send(&self, _notification: &Notification) -> Result<(), SinkError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SinkError::Transport("chat unreachable".to_string()))
        }
    }

    /// Blob store keeping bytes in memory.
    #[derive(Debug, Default)]
    pub struct InMemoryBlobStore {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl InMemoryBlobStore {
        /// Create an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Whether bytes are stored under `reference`.
        pub async fn contains(&self, reference: &StoredReference) -> bool {
            self.blobs.lock().await.contains_key(reference.as_str())
        }

        /// Number of stored blobs.
        pub async fn len(&self) -> usize {
            self.blobs.lock().await.len()
        }

        /// Whether nothing is stored.
        pub async fn is_empty(&self) -> bool {
            self.blobs.lock().await.is_empty()
        }
    }

    #[async_trait]
    impl BlobStore for InMemoryBlobStore {
        async fn put(&self, reference: &StoredReference, bytes: &[u8]) -> Result<(), BlobError> {
            self.blobs
                .lock()
                .await
                .insert(reference.as_str().to_string(), bytes.to_vec());
            Ok(())
        }

        async fn get(&self, reference: &StoredReference) -> Result<Vec<u8>, BlobError> {
            self.blobs
                .lock()
                .await
                .get(reference.as_str())
                .cloned()
                .ok_or_else(|| BlobError::NotFound(reference.to_string()))
        }

        async fn delete(&self, reference: &StoredReference) -> Result<(), BlobError> {
            self.blobs.lock().await.remove(reference.as_str());
            Ok(())
        }
    }
}

/// A registry wired to in-memory collaborators.
pub mod helpers {
    use super::mocks::{InMemoryBlobStore, RecordingSink, SteppingClock};
    use super::test_time;
    use chrono::Duration;
    use helpdesk_core::attachment::AttachmentPolicy;
    use helpdesk_core::{Actor, ExternalId, RoleDirectory, TicketDraft};
    use helpdesk_runtime::{
        HelpdeskStore, InMemoryStore, NotificationDispatcher, TicketRegistry, UserUpsert,
    };
    use std::sync::Arc;

    /// External id of the configured admin.
    pub const ADMIN_EXTERNAL_ID: i64 = 9001;
    /// External id of the configured support member.
    pub const SUPPORT_EXTERNAL_ID: i64 = 9002;
    /// Web app URL used in notification links.
    pub const WEBAPP_URL: &str = "https://t.me/helpdesk_test_bot/app";

    /// Registry plus handles on every collaborator it uses.
    pub struct TestHelpdesk {
        /// The registry under test
        pub registry: TicketRegistry,
        /// Its store
        pub store: Arc<InMemoryStore>,
        /// Its blob store
        pub blobs: Arc<InMemoryBlobStore>,
        /// Where notifications end up
        pub sink: Arc<RecordingSink>,
        /// Configured role membership
        pub roles: Arc<RoleDirectory>,
    }

    impl TestHelpdesk {
        /// Registry with one admin, one support member and default upload limits.
        #[must_use]
        pub fn new() -> Self {
            Self::with_policy(AttachmentPolicy::default())
        }

        /// Registry with custom upload limits.
        #[must_use]
        pub fn with_policy(policy: AttachmentPolicy) -> Self {
            let store = Arc::new(InMemoryStore::new());
            let blobs = Arc::new(InMemoryBlobStore::new());
            let sink = Arc::new(RecordingSink::new());
            let roles = Arc::new(RoleDirectory::new(
                [ExternalId(ADMIN_EXTERNAL_ID)],
                [ExternalId(SUPPORT_EXTERNAL_ID)],
            ));
            let dispatcher = NotificationDispatcher::new(
                sink.clone(),
                Arc::clone(&roles),
                Some(WEBAPP_URL.to_string()),
            );
            let registry = TicketRegistry::new(
                store.clone(),
                blobs.clone(),
                dispatcher,
                Arc::new(SteppingClock::new(test_time(), Duration::seconds(1))),
                policy,
            );
            Self {
                registry,
                store,
                blobs,
                sink,
                roles,
            }
        }

        /// Record a user the way a successful login does and return its actor.
        ///
        /// # Panics
        ///
        /// Panics if the store rejects the upsert.
        #[allow(clippy::expect_used)] // Test helper
        pub async fn sign_in(&self, external_id: i64, name: &str) -> Actor {
            let external_id = ExternalId(external_id);
            let user = self
                .store
                .upsert_user(UserUpsert {
                    external_id,
                    username: Some(name.to_lowercase()),
                    display_name: name.to_string(),
                    role: self.roles.role_for(external_id),
                    at: test_time(),
                })
                .await
                .expect("in-memory upsert should succeed");
            Actor::from(&user)
        }

        /// The configured admin.
        pub async fn admin(&self) -> Actor {
            self.sign_in(ADMIN_EXTERNAL_ID, "Admin").await
        }

        /// The configured support member.
        pub async fn support(&self) -> Actor {
            self.sign_in(SUPPORT_EXTERNAL_ID, "Support").await
        }

        /// Wait for background notifications to finish.
        ///
        /// # Panics
        ///
        /// Panics if deliveries are still running after one second.
        #[allow(clippy::expect_used)] // Test helper
        pub async fn settle(&self) {
            self.registry
                .dispatcher()
                .shutdown(std::time::Duration::from_secs(1))
                .await
                .expect("notifications should settle");
        }
    }

    impl Default for TestHelpdesk {
        fn default() -> Self {
            Self::new()
        }
    }

    /// A valid draft with the given title.
    #[must_use]
    pub fn draft(title: &str) -> TicketDraft {
        TicketDraft {
            title: title.to_string(),
            description: format!("{title}: details"),
            ..TicketDraft::default()
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use helpdesk_core::{Role, TicketStatus};
    use proptest::prelude::*;
    use proptest::sample::select;

    /// Any lifecycle status.
    pub fn any_status() -> impl Strategy<Value = TicketStatus> {
        select(TicketStatus::ALL.to_vec())
    }

    /// Any role.
    pub fn any_role() -> impl Strategy<Value = Role> {
        select(vec![Role::Author, Role::Support, Role::Admin])
    }
}

/// Install a test-friendly tracing subscriber once per process.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("helpdesk=debug")
        .try_init();
}

/// 2025-01-01 00:00:00 UTC.
#[must_use]
pub fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A fixed clock at [`test_time`].
#[must_use]
pub fn test_clock() -> mocks::FixedClock {
    mocks::FixedClock::new(test_time())
}

pub use helpers::{TestHelpdesk, draft};
pub use mocks::{FailingSink, FixedClock, InMemoryBlobStore, RecordingSink, SteppingClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_does_not_move() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn stepping_clock_advances_per_reading() {
        let clock = SteppingClock::new(test_time(), Duration::seconds(2));
        let first = clock.now();
        let second = clock.now();
        assert_eq!(second - first, Duration::seconds(2));
    }
}
