//! Attachment records and the upload policy.
//!
//! The file-type filter looks at the extension of the user-supplied name
//! only. It does not sniff content and is easy to bypass by renaming.

use crate::error::{Result, TicketError};
use crate::types::{AttachmentId, MessageId, TicketId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path};

/// Default maximum attachment size: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Extensions refused by default.
pub const DEFAULT_FORBIDDEN_EXTENSIONS: [&str; 11] = [
    ".exe", ".bat", ".cmd", ".sh", ".msi", ".ps1", ".vbs", ".app", ".bin", ".dll", ".com",
];

/// Name used when the client sends a file without one.
pub const FALLBACK_FILENAME: &str = "file";

/// Size and type limits applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPolicy {
    max_size: u64,
    forbidden_extensions: HashSet<String>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE, DEFAULT_FORBIDDEN_EXTENSIONS)
    }
}

impl AttachmentPolicy {
    /// Build a policy. Extensions are normalized to lower case with a
    /// leading dot.
    #[must_use]
    pub fn new<I, S>(max_size: u64, forbidden_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let forbidden_extensions = forbidden_extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        Self {
            max_size,
            forbidden_extensions,
        }
    }

    /// Largest accepted payload in bytes.
    #[must_use]
    pub const fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Check a prospective upload.
    ///
    /// The extension is checked before the size, independent of ticket state.
    ///
    /// # Errors
    ///
    /// - [`TicketError::DisallowedFileType`] if the extension is forbidden
    /// - [`TicketError::PayloadTooLarge`] if `size` exceeds the maximum
    pub fn check(&self, filename: &str, size: u64) -> Result<()> {
        if let Some(extension) = extension_of(filename) {
            if self.forbidden_extensions.contains(&extension) {
                return Err(TicketError::DisallowedFileType { extension });
            }
        }
        if size > self.max_size {
            return Err(TicketError::PayloadTooLarge {
                size,
                max: self.max_size,
            });
        }
        Ok(())
    }
}

/// Lower-cased final extension of `filename` with its leading dot.
///
/// Dot-files such as `.bashrc` have no extension.
#[must_use]
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
}

fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{}", trimmed.to_lowercase()))
    }
}

/// Opaque storage key of an attachment's bytes.
///
/// Generated as `<ticket_id>/<random hex>_<basename>`; only the basename comes
/// from the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredReference(String);

impl StoredReference {
    /// Generate a fresh, collision-resistant reference for an upload.
    #[must_use]
    pub fn generate(ticket_id: TicketId, filename: &str) -> Self {
        let basename = Path::new(filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_FILENAME.to_string());
        Self(format!(
            "{ticket_id}/{}_{basename}",
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Accept a client-supplied reference only if it stays inside the
    /// storage root.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Forbidden`] for empty or absolute references,
    /// or references with `..` components.
    pub fn parse(raw: &str) -> Result<Self> {
        let escapes = raw.is_empty()
            || Path::new(raw)
                .components()
                .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(TicketError::forbidden("invalid path"));
        }
        Ok(Self(raw.to_string()))
    }

    /// Wrap a reference read back from the store.
    #[must_use]
    pub const fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    /// The reference as a relative path string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoredReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted attachment, either ticket-level or bound to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Store-assigned identifier
    pub id: AttachmentId,
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Owning message for message-level attachments
    pub message_id: Option<MessageId>,
    /// Original, untrusted file name
    pub filename: String,
    /// Where the bytes live
    pub reference: StoredReference,
    /// Size in bytes
    pub filesize: u64,
    /// Uploader
    pub uploaded_by: Option<UserId>,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
}

/// An attachment whose bytes are stored but whose record is not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    /// Owning ticket
    pub ticket_id: TicketId,
    /// Original, untrusted file name
    pub filename: String,
    /// Where the bytes live
    pub reference: StoredReference,
    /// Size in bytes
    pub filesize: u64,
    /// Uploader
    pub uploaded_by: UserId,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
}

impl NewAttachment {
    /// Turn into a persisted record.
    #[must_use]
    pub fn into_attachment(self, id: AttachmentId, message_id: Option<MessageId>) -> Attachment {
        Attachment {
            id,
            ticket_id: self.ticket_id,
            message_id,
            filename: self.filename,
            reference: self.reference,
            filesize: self.filesize,
            uploaded_by: Some(self.uploaded_by),
            uploaded_at: self.uploaded_at,
        }
    }
}
