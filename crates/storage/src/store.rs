// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! The history store.
//!
//! # Locking
//!
//! Series live in a `DashMap` of `Arc<RwLock<SeriesState>>`. Listing names
//! or creating a series never takes a global lock, and each series has its
//! own exclusive-write / shared-read lock, so an append is atomic with
//! respect to readers of that series and invisible to every other series.
//!
//! # Durability
//!
//! Appends bump a generation counter. A flush snapshots every series under
//! its read lock, writes the document through the [`SnapshotBackend`] under
//! `flush_timeout`, and on success records the generation it covered. A
//! failed flush leaves memory untouched, so calling [`HistoryStore::flush`]
//! again is always safe.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use bench_history_core::{
    CommitEntry, Error, NotFoundError, PersistenceError, Result, ValidationError,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::SnapshotBackend;
use crate::config::{FlushPolicy, StoreConfig};
use crate::document::HistoryDocument;
use crate::series::{Position, SeriesSnapshot, SeriesState};

/// Result of a successful [`HistoryStore::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Nothing changed since the last successful flush.
    Clean,
    /// A snapshot was written.
    Written {
        /// Number of series written.
        series: usize,
        /// Number of entries written.
        entries: usize,
    },
}

/// Point-in-time store statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Number of series.
    pub series: usize,
    /// Number of entries across all series.
    pub entries: usize,
    /// Whether appends are waiting for a flush.
    pub dirty: bool,
    /// Time of the last successful flush.
    pub last_flush: Option<DateTime<Utc>>,
    /// Error of the last failed flush, cleared by a successful one.
    pub last_flush_error: Option<String>,
}

#[derive(Debug, Default)]
struct FlushState {
    last_flush: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// In-memory, per-series benchmark history with snapshot persistence.
///
/// Construct with [`HistoryStore::open`] and share as `Arc<HistoryStore>`;
/// call [`HistoryStore::shutdown`] before dropping to persist pending
/// appends.
pub struct HistoryStore {
    series: DashMap<String, Arc<RwLock<SeriesState>>>,
    backend: Arc<dyn SnapshotBackend>,
    config: StoreConfig,
    repo_url: Option<String>,
    generation: AtomicU64,
    flushed_generation: AtomicU64,
    flush_state: Mutex<FlushState>,
    wake_flusher: Arc<Notify>,
    shutdown: CancellationToken,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("backend", &self.backend.describe())
            .field("series", &self.series.len())
            .field("flush_policy", &self.config.flush_policy)
            .finish()
    }
}

impl HistoryStore {
    /// Load the persisted snapshot and start the background flusher if the
    /// policy asks for one.
    pub async fn open(backend: Arc<dyn SnapshotBackend>, config: StoreConfig) -> Result<Arc<Self>> {
        let document = backend.load().await?.unwrap_or_default();
        let entries = document.entry_count();

        let series = DashMap::new();
        for (name, entries) in document.entries {
            series.insert(name, Arc::new(RwLock::new(SeriesState::from_entries(entries))));
        }

        info!(
            backend = %backend.describe(),
            series = series.len(),
            entries,
            flush_policy = %config.flush_policy,
            "History store opened"
        );

        let store = Arc::new(Self {
            series,
            repo_url: config.repo_url.clone().or(document.repo_url),
            backend,
            config,
            generation: AtomicU64::new(0),
            flushed_generation: AtomicU64::new(0),
            flush_state: Mutex::new(FlushState::default()),
            wake_flusher: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
            flusher: Mutex::new(None),
        });

        if store.config.flush_policy == FlushPolicy::Interval {
            let handle = tokio::spawn(run_flusher(
                Arc::downgrade(&store),
                store.config.flush_interval,
                Arc::clone(&store.wake_flusher),
                store.shutdown.clone(),
            ));
            *store.flusher.lock().await = Some(handle);
        }

        Ok(store)
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Append an entry, replacing any entry with the same commit id.
    ///
    /// Only minimal checks happen here; full validation is the ingestor's
    /// job. The entry is visible to readers as soon as this returns, whether
    /// or not it has been flushed.
    pub async fn append(&self, series: &str, entry: CommitEntry) -> Result<Position> {
        check_append(series, &entry)?;

        let lock = self
            .series
            .entry(series.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(SeriesState::default())))
            .clone();

        let commit = entry.id().to_string();
        let records = entry.benches.len();
        let (position, replaced) = lock.write().await.upsert(entry);
        self.generation.fetch_add(1, Ordering::AcqRel);
        if self.config.flush_policy == FlushPolicy::Interval {
            self.wake_flusher.notify_one();
        }

        if replaced {
            info!(series, %commit, %position, records, "Replaced existing commit entry");
        } else {
            debug!(series, %commit, %position, records, "Appended commit entry");
        }
        Ok(position)
    }

    /// Date-ordered snapshot of a series.
    pub async fn get_series(&self, series: &str) -> Result<SeriesSnapshot> {
        let lock = self
            .series
            .get(series)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| NotFoundError::Series(series.to_string()))?;
        let state = lock.read().await;
        Ok(state.snapshot(series))
    }

    /// Names of all series.
    pub fn list_series_names(&self) -> BTreeSet<String> {
        self.series.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Whether appends are waiting for a flush.
    pub fn is_dirty(&self) -> bool {
        self.generation.load(Ordering::Acquire) != self.flushed_generation.load(Ordering::Acquire)
    }

    /// Build the document that a flush would write.
    pub async fn document(&self) -> HistoryDocument {
        let mut document = HistoryDocument {
            last_update: Some(Utc::now().timestamp_millis()),
            repo_url: self.repo_url.clone(),
            ..HistoryDocument::default()
        };
        for (name, lock) in self.series_locks() {
            let snapshot = lock.read().await.snapshot(&name);
            document.entries.insert(name, snapshot.to_vec());
        }
        document
    }

    /// Persist the current state.
    ///
    /// Concurrent calls are serialized. Returns [`FlushOutcome::Clean`]
    /// without touching the backend when nothing changed since the last
    /// successful flush.
    pub async fn flush(&self) -> Result<FlushOutcome> {
        let mut state = self.flush_state.lock().await;

        let generation = self.generation.load(Ordering::Acquire);
        if generation == self.flushed_generation.load(Ordering::Acquire)
            && state.last_error.is_none()
        {
            return Ok(FlushOutcome::Clean);
        }

        let document = self.document().await;
        let series = document.entries.len();
        let entries = document.entry_count();

        let started = Instant::now();
        let timeout = self.config.flush_timeout;
        let result = match tokio::time::timeout(timeout, self.backend.save(&document)).await {
            Ok(result) => result,
            Err(_) => Err(PersistenceError::Timeout(timeout)),
        };
        metrics::histogram!("bench_history_flush_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                self.flushed_generation.store(generation, Ordering::Release);
                state.last_flush = Some(Utc::now());
                state.last_error = None;
                info!(
                    backend = %self.backend.describe(),
                    series,
                    entries,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "History flushed"
                );
                Ok(FlushOutcome::Written { series, entries })
            }
            Err(err) => {
                metrics::counter!("bench_history_flush_failures_total").increment(1);
                error!(backend = %self.backend.describe(), error = %err, "History flush failed");
                state.last_error = Some(err.to_string());
                Err(Error::Persistence(err))
            }
        }
    }

    /// Current statistics.
    pub async fn stats(&self) -> StoreStats {
        let mut entries = 0;
        let locks = self.series_locks();
        for (_, lock) in &locks {
            entries += lock.read().await.len();
        }
        let flush_state = self.flush_state.lock().await;
        StoreStats {
            series: locks.len(),
            entries,
            dirty: self.is_dirty(),
            last_flush: flush_state.last_flush,
            last_flush_error: flush_state.last_error.clone(),
        }
    }

    /// Stop the background flusher and persist pending appends.
    pub async fn shutdown(&self) -> Result<FlushOutcome> {
        self.shutdown.cancel();
        if let Some(handle) = self.flusher.lock().await.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "Background flusher ended abnormally");
            }
        }
        let outcome = self.flush().await?;
        info!("History store shut down");
        Ok(outcome)
    }

    fn series_locks(&self) -> Vec<(String, Arc<RwLock<SeriesState>>)> {
        self.series
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }
}

impl Drop for HistoryStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn check_append(series: &str, entry: &CommitEntry) -> std::result::Result<(), ValidationError> {
    if series.trim().is_empty() {
        return Err(ValidationError::new("series", "series name must not be empty"));
    }
    if entry.id().trim().is_empty() {
        return Err(ValidationError::new("commit.id", "commit id must not be empty"));
    }
    if entry.date < 0 {
        return Err(ValidationError::new("date", "run time must not be negative"));
    }
    // A non-finite value would be written as `null` and break the next load.
    if let Some(i) = entry.benches.iter().position(|record| !record.value.is_finite()) {
        return Err(ValidationError::new(
            format!("benches[{i}].value"),
            "value must be a finite number",
        ));
    }
    Ok(())
}

/// Waits for the first append after a flush, lets further appends coalesce
/// for `interval`, then flushes. A failed flush re-arms itself.
async fn run_flusher(
    store: Weak<HistoryStore>,
    interval: std::time::Duration,
    wake: Arc<Notify>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = wake.notified() => {}
        }
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let Some(store) = store.upgrade() else {
            break;
        };
        if store.is_dirty() && store.flush().await.is_err() {
            // Already logged and kept in stats.
            wake.notify_one();
        }
    }
    debug!("Background flusher stopped");
}
