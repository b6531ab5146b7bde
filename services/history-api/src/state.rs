// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared application state.

use std::fmt;
use std::sync::Arc;

use bench_history_collector::{IngestConfig, Ingestor};
use bench_history_query::QueryEngine;
use bench_history_storage::HistoryStore;
use metrics_exporter_prometheus::PrometheusHandle;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The history store.
    pub store: Arc<HistoryStore>,
    /// Write path.
    pub ingestor: Ingestor,
    /// Read path.
    pub engine: QueryEngine,
    /// Prometheus renderer, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the state around an opened store.
    pub fn new(store: Arc<HistoryStore>, ingest: IngestConfig) -> Self {
        Self {
            ingestor: Ingestor::new(Arc::clone(&store), ingest),
            engine: QueryEngine::new(Arc::clone(&store)),
            store,
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

// `PrometheusHandle` has no `Debug`; report only whether it is installed.
impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("ingestor", &self.ingestor)
            .field("engine", &self.engine)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
