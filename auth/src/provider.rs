//! Identity provider seam.

use crate::error::Result;
use crate::telegram::{ExternalIdentity, InitDataValidator};
use chrono::{DateTime, Utc};

/// Exchanges an opaque client credential for an external identity.
pub trait IdentityProvider: Send + Sync {
    /// Verify `credential` and say who it belongs to.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`](crate::AuthError) when the credential is not
    /// genuine or has expired.
    fn identify(&self, credential: &str, now: DateTime<Utc>) -> Result<ExternalIdentity>;
}

impl IdentityProvider for InitDataValidator {
    fn identify(&self, credential: &str, now: DateTime<Utc>) -> Result<ExternalIdentity> {
        self.validate(credential, now)
    }
}
