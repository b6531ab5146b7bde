// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! The ingestor: validate, normalize, append.

use std::collections::BTreeMap;
use std::sync::Arc;

use bench_history_core::{CommitEntry, Error, Result, ValidationError};
use bench_history_storage::{FlushPolicy, HistoryDocument, HistoryStore, Position};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::normalize::normalize_entry;
use crate::validate::validate_entry;

/// An entry [`Ingestor::import_document`] refused.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedEntry {
    /// Series the entry belonged to.
    pub series: String,
    /// Commit id as given.
    pub commit: String,
    /// Why it was refused.
    pub error: String,
}

/// Outcome of [`Ingestor::import_document`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Entries accepted per series.
    pub imported: BTreeMap<String, usize>,
    /// Entries refused.
    pub rejected: Vec<RejectedEntry>,
}

impl ImportReport {
    /// Total number of accepted entries.
    pub fn total_imported(&self) -> usize {
        self.imported.values().sum()
    }
}

/// Accepts CI run results into a [`HistoryStore`].
#[derive(Debug, Clone)]
pub struct Ingestor {
    store: Arc<HistoryStore>,
    config: IngestConfig,
}

impl Ingestor {
    /// Create an ingestor writing to `store`.
    pub fn new(store: Arc<HistoryStore>, config: IngestConfig) -> Self {
        Self { store, config }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// Validate, normalize and append one entry.
    ///
    /// The entry is accepted whole or not at all. With
    /// [`FlushPolicy::OnAppend`] the store is flushed before returning and a
    /// persistence failure is returned, though the append stays applied.
    pub async fn ingest(&self, series: &str, entry: CommitEntry) -> Result<Position> {
        let entry = self.prepare(series, entry)?;
        let commit = entry.id().to_string();
        let position = self.store.append(series, entry).await?;
        metrics::counter!("bench_history_ingest_total").increment(1);
        info!(series, %commit, %position, "Ingested benchmark run");

        if self.store.config().flush_policy == FlushPolicy::OnAppend {
            self.store.flush().await?;
        }
        Ok(position)
    }

    /// Ingest every entry of an existing history document.
    ///
    /// Invalid entries are skipped and listed in the report. The store is
    /// flushed once at the end under [`FlushPolicy::OnAppend`].
    pub async fn import_document(&self, document: HistoryDocument) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        for (series, entries) in document.entries {
            for entry in entries {
                let commit = entry.id().to_string();
                let outcome = match self.prepare(&series, entry) {
                    Ok(entry) => self.store.append(&series, entry).await,
                    Err(err) => Err(Error::Validation(err)),
                };
                match outcome {
                    Ok(position) => {
                        metrics::counter!("bench_history_ingest_total").increment(1);
                        debug!(series = %series, %commit, %position, "Imported entry");
                        *report.imported.entry(series.clone()).or_default() += 1;
                    }
                    Err(err) => report.rejected.push(RejectedEntry {
                        series: series.clone(),
                        commit,
                        error: err.to_string(),
                    }),
                }
            }
        }

        info!(
            imported = report.total_imported(),
            rejected = report.rejected.len(),
            series = report.imported.len(),
            "Imported history document"
        );

        if self.store.config().flush_policy == FlushPolicy::OnAppend {
            self.store.flush().await?;
        }
        Ok(report)
    }

    fn prepare(
        &self,
        series: &str,
        entry: CommitEntry,
    ) -> std::result::Result<CommitEntry, ValidationError> {
        if let Err(err) = validate_entry(series, &entry) {
            metrics::counter!("bench_history_ingest_rejected_total").increment(1);
            warn!(series, commit = %entry.id(), field = %err.field, error = %err.message, "Rejected benchmark run");
            return Err(err);
        }
        Ok(normalize_entry(entry, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bench_history_core::{BenchmarkRecord, PersistenceError};
    use bench_history_storage::{MemoryBackend, SnapshotBackend, StoreConfig};

    fn entry(id: &str, date: i64, value: f64) -> CommitEntry {
        CommitEntry::builder()
            .id(id)
            .date(date)
            .tool("go")
            .bench(BenchmarkRecord::new("BenchX", value, "ns/op"))
            .build()
            .unwrap()
    }

    async fn ingestor(policy: FlushPolicy) -> (Ingestor, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = HistoryStore::open(backend.clone(), StoreConfig::with_policy(policy))
            .await
            .unwrap();
        (Ingestor::new(store, IngestConfig::default()), backend)
    }

    struct BrokenBackend;

    #[async_trait]
    impl SnapshotBackend for BrokenBackend {
        async fn load(&self) -> std::result::Result<Option<HistoryDocument>, PersistenceError> {
            Ok(None)
        }
        async fn save(&self, _: &HistoryDocument) -> std::result::Result<(), PersistenceError> {
            Err(PersistenceError::Backend("read-only volume".to_string()))
        }
        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    #[tokio::test]
    async fn test_ingest_appends_and_returns_position() {
        let (ingestor, _) = ingestor(FlushPolicy::Manual).await;
        assert_eq!(ingestor.ingest("suite", entry("abc123", 1, 100.0)).await.unwrap(), Position(0));
        assert_eq!(ingestor.ingest("suite", entry("def456", 2, 150.0)).await.unwrap(), Position(1));
        assert_eq!(ingestor.store().get_series("suite").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_nan_is_rejected_and_store_unchanged() {
        let (ingestor, _) = ingestor(FlushPolicy::Manual).await;
        let err = ingestor
            .ingest("suite", entry("abc123", 1, f64::NAN))
            .await
            .unwrap_err();

        match err {
            Error::Validation(err) => assert_eq!(err.field, "benches[0].value"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(ingestor.store().get_series("suite").await.unwrap_err().is_not_found());
        assert!(!ingestor.store().is_dirty());
    }

    #[tokio::test]
    async fn test_ingest_normalizes_composite_units() {
        let (ingestor, _) = ingestor(FlushPolicy::Manual).await;
        let run = CommitEntry::builder()
            .id("abc123")
            .date(1)
            .bench(BenchmarkRecord::new("BenchmarkParse", 1920.0, "ns/op\t 184 B/op\t 3 allocs/op"))
            .build()
            .unwrap();
        ingestor.ingest("suite", run).await.unwrap();

        let series = ingestor.store().get_series("suite").await.unwrap();
        let stored = &series.entries()[0];
        assert_eq!(stored.benches.len(), 4);
        assert_eq!(stored.bench("BenchmarkParse - allocs/op").unwrap().value, 3.0);
    }

    #[tokio::test]
    async fn test_on_append_flushes_before_returning() {
        let (ingestor, backend) = ingestor(FlushPolicy::OnAppend).await;
        ingestor.ingest("suite", entry("abc123", 1, 100.0)).await.unwrap();
        assert_eq!(backend.save_count(), 1);
        assert!(!ingestor.store().is_dirty());
    }

    #[tokio::test]
    async fn test_on_append_persistence_failure_keeps_entry() {
        let store = HistoryStore::open(
            Arc::new(BrokenBackend),
            StoreConfig::with_policy(FlushPolicy::OnAppend),
        )
        .await
        .unwrap();
        let ingestor = Ingestor::new(store, IngestConfig::default());

        let err = ingestor
            .ingest("suite", entry("abc123", 1, 100.0))
            .await
            .unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(ingestor.store().get_series("suite").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_document_reports_per_series() {
        let (ingestor, backend) = ingestor(FlushPolicy::OnAppend).await;
        let mut document = HistoryDocument::default();
        document.entries.insert(
            "alpha".to_string(),
            vec![entry("aaaa01", 1, 1.0), entry("aaaa02", 2, f64::NAN)],
        );
        document
            .entries
            .insert("beta".to_string(), vec![entry("bbbb01", 1, 2.0)]);

        let report = ingestor.import_document(document).await.unwrap();
        assert_eq!(report.imported.get("alpha"), Some(&1));
        assert_eq!(report.imported.get("beta"), Some(&1));
        assert_eq!(report.total_imported(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].commit, "aaaa02");
        assert!(report.rejected[0].error.contains("benches[0].value"));
        assert_eq!(backend.save_count(), 1);
    }

    #[tokio::test]
    async fn test_import_artifact_json() {
        let (ingestor, _) = ingestor(FlushPolicy::Manual).await;
        let document: HistoryDocument = serde_json::from_str(
            r#"{
                "lastUpdate": 1770486302525,
                "entries": {
                    "Benchmark": [{
                        "commit": {
                            "author": {"email": "dev@example.com", "name": "Dev"},
                            "committer": {"email": "dev@example.com", "name": "Dev"},
                            "distinct": true,
                            "id": "f91953a63a111eaeeb38e64b856ec959cf9c9b36",
                            "timestamp": "2026-02-07T18:37:45+01:00"
                        },
                        "date": 1770486302219,
                        "tool": "go",
                        "benches": [{
                            "name": "BenchmarkParcoAlloc_Compile/small_size",
                            "value": 1920,
                            "unit": "ns/op\t        91.00 payload_bytes/op\t     184 B/op\t       3 allocs/op",
                            "extra": "591492 times\n4 procs"
                        }]
                    }]
                }
            }"#,
        )
        .unwrap();

        let report = ingestor.import_document(document).await.unwrap();
        assert_eq!(report.total_imported(), 1);
        let series = ingestor.store().get_series("Benchmark").await.unwrap();
        assert_eq!(series.entries()[0].benches.len(), 5);
    }
}
