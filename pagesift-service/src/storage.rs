//! Short-lived storage for uploaded documents.
//!
//! Each request stores its upload once, reads it back for processing, and
//! releases it when finished, whatever the outcome. Handles are unique per
//! upload, so concurrent requests never touch each other's data.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StorageError;

/// Opaque reference to one stored upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadHandle {
    File(PathBuf),
    Memory(Uuid),
}

impl std::fmt::Display for UploadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadHandle::File(path) => write!(f, "{}", path.display()),
            UploadHandle::Memory(id) => write!(f, "memory:{}", id),
        }
    }
}

/// Storage capability for in-flight uploads
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn store(&self, data: Bytes) -> Result<UploadHandle, StorageError>;

    async fn read_all(&self, handle: &UploadHandle) -> Result<Bytes, StorageError>;

    /// Best effort; a failed release is logged, never returned.
    async fn release(&self, handle: UploadHandle);
}

/// Uploads written to uniquely named files in a directory
pub struct TempFileStore {
    dir: PathBuf,
}

impl TempFileStore {
    /// Use `dir` for uploads, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl UploadStore for TempFileStore {
    async fn store(&self, data: Bytes) -> Result<UploadHandle, StorageError> {
        let dir = self.dir.clone();
        let write_error = |source| StorageError::Write {
            path: dir.display().to_string(),
            source,
        };

        let file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".pdf")
            .tempfile_in(&dir)
            .map_err(write_error)?;

        // Persist the name; the file now lives until release()
        let (file, path) = file.keep().map_err(|e| write_error(e.error))?;
        drop(file);

        if let Err(source) = tokio::fs::write(&path, &data).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(StorageError::Write {
                path: path.display().to_string(),
                source,
            });
        }

        debug!(path = %path.display(), bytes = data.len(), "Stored upload");
        Ok(UploadHandle::File(path))
    }

    async fn read_all(&self, handle: &UploadHandle) -> Result<Bytes, StorageError> {
        match handle {
            UploadHandle::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|source| StorageError::Read {
                    path: path.display().to_string(),
                    source,
                }),
            UploadHandle::Memory(_) => Err(StorageError::UnknownHandle {
                id: handle.to_string(),
            }),
        }
    }

    async fn release(&self, handle: UploadHandle) {
        let path = match handle {
            UploadHandle::File(path) => path,
            other => {
                warn!(handle = %other, "Release of foreign handle ignored");
                return;
            }
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Released upload"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove upload"),
        }
    }
}

/// Uploads kept in process memory
#[derive(Default)]
pub struct MemoryStore {
    uploads: DashMap<Uuid, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryStore {
    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }
}

#[async_trait]
impl UploadStore for MemoryStore {
    async fn store(&self, data: Bytes) -> Result<UploadHandle, StorageError> {
        let id = Uuid::new_v4();
        debug!(%id, bytes = data.len(), "Buffered upload");
        self.uploads.insert(id, data);
        Ok(UploadHandle::Memory(id))
    }

    async fn read_all(&self, handle: &UploadHandle) -> Result<Bytes, StorageError> {
        match handle {
            UploadHandle::Memory(id) => self
                .uploads
                .get(id)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| StorageError::UnknownHandle {
                    id: handle.to_string(),
                }),
            UploadHandle::File(_) => Err(StorageError::UnknownHandle {
                id: handle.to_string(),
            }),
        }
    }

    async fn release(&self, handle: UploadHandle) {
        match handle {
            UploadHandle::Memory(id) if self.uploads.remove(&id).is_some() => {
                debug!(%id, "Released upload");
            }
            other => warn!(handle = %other, "Release of unknown handle ignored"),
        }
    }
}
