// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Snapshot persistence backends.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use bench_history_core::PersistenceError;
use tokio::sync::Mutex;
use tracing::debug;

use crate::document::{HistoryDocument, StorageFormat};

/// Durable storage for whole-history snapshots.
///
/// `save` must be idempotent: the store may call it again with the same
/// document after a failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Load the last saved snapshot, `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<HistoryDocument>, PersistenceError>;

    /// Replace the saved snapshot.
    async fn save(&self, document: &HistoryDocument) -> Result<(), PersistenceError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Stores the history as a single JSON or `data.js` file.
///
/// Each save writes a fresh, uniquely named sibling file and renames it over
/// the target, so a crash mid-write leaves the previous snapshot intact. Saves
/// are serialized: a write left running by a timed-out flush finishes before
/// the retry renames its own file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
    format: StorageFormat,
    write_lock: Arc<std::sync::Mutex<()>>,
}

impl JsonFileBackend {
    /// Create a backend for `path` with an explicit format.
    pub fn new(path: impl Into<PathBuf>, format: StorageFormat) -> Self {
        Self {
            path: path.into(),
            format,
            write_lock: Arc::default(),
        }
    }

    /// Create a backend whose format follows the file extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = StorageFormat::from_path(&path);
        Self::new(path, format)
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encoding used on save.
    pub fn format(&self) -> StorageFormat {
        self.format
    }

    fn temp_prefix(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(".{name}.")
    }
}

#[async_trait]
impl SnapshotBackend for JsonFileBackend {
    async fn load(&self) -> Result<Option<HistoryDocument>, PersistenceError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(PersistenceError::io(&self.path, error)),
        };
        if text.trim().is_empty() {
            debug!(path = ?self.path, "History file is empty");
            return Ok(None);
        }
        HistoryDocument::decode(&text).map(Some)
    }

    async fn save(&self, document: &HistoryDocument) -> Result<(), PersistenceError> {
        let content = document.encode(self.format)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|error| PersistenceError::io(parent, error))?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };
        let path = self.path.clone();
        let prefix = self.temp_prefix();
        let write_lock = Arc::clone(&self.write_lock);

        tokio::task::spawn_blocking(move || -> Result<(), PersistenceError> {
            let _guard = write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut temp = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(".tmp")
                .tempfile_in(&dir)
                .map_err(|error| PersistenceError::io(&dir, error))?;
            temp.write_all(content.as_bytes())
                .and_then(|()| temp.as_file().sync_all())
                .map_err(|error| PersistenceError::io(temp.path(), error))?;
            temp.persist(&path)
                .map_err(|error| PersistenceError::io(&path, error.error))?;
            Ok(())
        })
        .await
        .map_err(|error| PersistenceError::Backend(format!("snapshot writer failed: {error}")))?
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.path.display(), self.format)
    }
}

/// Keeps the snapshot in memory. Used for ephemeral stores and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    document: Mutex<Option<HistoryDocument>>,
    saves: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that starts from `document`.
    pub fn with_document(document: HistoryDocument) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Last saved document.
    pub async fn document(&self) -> Option<HistoryDocument> {
        self.document.lock().await.clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Acquire)
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<HistoryDocument>, PersistenceError> {
        Ok(self.document.lock().await.clone())
    }

    async fn save(&self, document: &HistoryDocument) -> Result<(), PersistenceError> {
        *self.document.lock().await = Some(document.clone());
        self.saves.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
