// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Bench History Storage
//!
//! The history store keeps every benchmark series in memory and persists
//! whole-history snapshots through a pluggable [`SnapshotBackend`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use bench_history_storage::{FlushPolicy, HistoryStore, JsonFileBackend, StoreConfig};
//!
//! # async fn example() -> bench_history_core::Result<()> {
//! let backend = Arc::new(JsonFileBackend::from_path("dev/bench/data.js"));
//! let store = HistoryStore::open(backend, StoreConfig::with_policy(FlushPolicy::Manual)).await?;
//! for name in store.list_series_names() {
//!     let series = store.get_series(&name).await?;
//!     println!("{name}: {} entries", series.len());
//! }
//! store.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod backend;
pub mod config;
pub mod document;
pub mod series;
pub mod store;

pub use backend::{JsonFileBackend, MemoryBackend, SnapshotBackend};
pub use config::{FlushPolicy, StoreConfig};
pub use document::{HistoryDocument, StorageFormat, DATA_JS_PREFIX};
pub use series::{Position, SeriesSnapshot};
pub use store::{FlushOutcome, HistoryStore, StoreStats};
