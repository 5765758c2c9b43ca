//! Attachment byte storage.

use async_trait::async_trait;
use helpdesk_core::TicketError;
use helpdesk_core::attachment::StoredReference;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Failures of a blob backend.
#[derive(Error, Debug)]
pub enum BlobError {
    /// No bytes stored under the reference
    #[error("blob {0} not found")]
    NotFound(String),

    /// Reference would resolve outside the storage root
    #[error("blob reference {0} escapes the storage root")]
    OutsideRoot(String),

    /// Backend I/O failed
    #[error("blob I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BlobError> for TicketError {
    fn from(error: BlobError) -> Self {
        match error {
            BlobError::NotFound(reference) => Self::NotFound {
                entity: "file",
                id: reference,
            },
            BlobError::OutsideRoot(reference) => {
                tracing::warn!(reference = %reference, "Refused blob path outside the storage root");
                Self::forbidden("access denied")
            }
            BlobError::Io(io) => Self::Storage(io.to_string()),
        }
    }
}

/// Where attachment bytes live.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `reference`, replacing nothing (references are
    /// unique).
    async fn put(&self, reference: &StoredReference, bytes: &[u8]) -> Result<(), BlobError>;

    /// Read the bytes stored under `reference`.
    async fn get(&self, reference: &StoredReference) -> Result<Vec<u8>, BlobError>;

    /// Remove the bytes stored under `reference`. Missing blobs are ignored.
    async fn delete(&self, reference: &StoredReference) -> Result<(), BlobError>;
}

/// Blob store backed by a directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Store blobs below `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only plain path segments may follow the root; references loaded from
    /// the database bypass `StoredReference::parse`.
    fn path_for(&self, reference: &StoredReference) -> Result<PathBuf, BlobError> {
        let relative = Path::new(reference.as_str());
        let contained = relative.components().next().is_some()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !contained {
            return Err(BlobError::OutsideRoot(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, reference: &StoredReference, bytes: &[u8]) -> Result<(), BlobError> {
        let path = self.path_for(reference)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(reference = %reference, size = bytes.len(), "Stored blob");
        Ok(())
    }

    async fn get(&self, reference: &StoredReference) -> Result<Vec<u8>, BlobError> {
        match tokio::fs::read(self.path_for(reference)?).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BlobError::NotFound(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, reference: &StoredReference) -> Result<(), BlobError> {
        match tokio::fs::remove_file(self.path_for(reference)?).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
