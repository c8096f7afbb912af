//! Disk-backed blob storage for synthesized audio.
//!
//! Blobs are opaque byte payloads written under a single media directory
//! with a generated name; the returned [`BlobRef`] is what domain rows
//! persist. The server exposes the directory read-only under `/media`, so
//! [`BlobStore::url`] just maps a reference to its public path when the
//! file still exists.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Public URL prefix under which the media directory is served.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Errors from blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob not found: {0}")]
    NotFound(String),

    /// Reference contains path separators or otherwise escapes the root.
    #[error("invalid blob reference: {0}")]
    InvalidRef(String),
}

/// An opaque reference to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef(String);

impl BlobRef {
    /// Wraps a reference previously returned by [`BlobStore::store`]
    /// (e.g. one read back from a database row).
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn ext_from_content_type(ct: &str) -> &'static str {
    match ct {
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        _ => "bin",
    }
}

/// Blob storage rooted at one media directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory blobs are written to (served as `/media`).
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &BlobRef) -> Result<PathBuf, BlobError> {
        let name = reference.as_str();
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(BlobError::InvalidRef(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Stores a byte payload and returns its reference.
    pub async fn store(&self, bytes: &[u8], content_type: &str) -> Result<BlobRef, BlobError> {
        let name = format!(
            "{}.{}",
            Uuid::new_v4(),
            ext_from_content_type(content_type)
        );

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&name), bytes).await?;

        tracing::debug!(blob = %name, bytes = bytes.len(), "stored blob");
        Ok(BlobRef(name))
    }

    /// Returns the public URL for a stored blob, or `None` if the file no
    /// longer exists (or the reference is malformed).
    pub async fn url(&self, reference: &BlobRef) -> Option<String> {
        let path = self.resolve(reference).ok()?;
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(format!("{}/{}", MEDIA_URL_PREFIX, reference.as_str())),
            _ => None,
        }
    }

    /// Deletes a stored blob. Missing files are an error so callers can
    /// distinguish "already gone" from a clean removal.
    pub async fn delete(&self, reference: &BlobRef) -> Result<(), BlobError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(reference.as_str().to_string()))
            }
            Err(e) => Err(BlobError::Io(e)),
        }
    }
}
