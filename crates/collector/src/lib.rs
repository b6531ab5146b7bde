// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Bench History Collector
//!
//! Accepts benchmark runs from CI, validates them, normalizes composite Go
//! benchmark units into single-metric records, and appends them to a
//! [`bench_history_storage::HistoryStore`].

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod ingestor;
pub mod normalize;
pub mod validate;

pub use config::IngestConfig;
pub use ingestor::{ImportReport, Ingestor, RejectedEntry};
pub use normalize::{exploded_name, normalize_entry};
pub use validate::{validate_entry, validate_series_name};
