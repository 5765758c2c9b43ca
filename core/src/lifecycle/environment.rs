//! Environment for the lifecycle reducer.

use crate::attachment::AttachmentPolicy;
use crate::environment::Clock;
use std::sync::Arc;

/// Dependencies the lifecycle reducer needs.
///
/// Production uses `SystemClock`, tests a fixed one.
pub trait LifecycleEnvironment: Send + Sync {
    /// Source of `updated_at` and message timestamps.
    fn clock(&self) -> &dyn Clock;

    /// Limits applied to attachments carried by actions.
    fn attachment_policy(&self) -> &AttachmentPolicy;
}

/// Production environment for the lifecycle reducer.
#[derive(Clone)]
pub struct ProductionLifecycleEnvironment {
    clock: Arc<dyn Clock>,
    attachment_policy: AttachmentPolicy,
}

impl ProductionLifecycleEnvironment {
    /// Create a new environment.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, attachment_policy: AttachmentPolicy) -> Self {
        Self {
            clock,
            attachment_policy,
        }
    }
}

impl LifecycleEnvironment for ProductionLifecycleEnvironment {
    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn attachment_policy(&self) -> &AttachmentPolicy {
        &self.attachment_policy
    }
}

impl std::fmt::Debug for ProductionLifecycleEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionLifecycleEnvironment")
            .field("attachment_policy", &self.attachment_policy)
            .finish_non_exhaustive()
    }
}
