// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for bench-history.
//!
//! This crate defines the data model shared by the ingestor, the history
//! store and the query engine:
//!
//! - [`record`] - a single named metric value produced by one CI run
//! - [`commit`] - a CI run attributed to a commit, with its records
//! - [`unit`] - unit classification, composite unit parsing and polarity
//! - [`error`] - the validation / persistence / not-found error taxonomy
//!
//! The exchanged document shape mirrors the dashboard data file produced by
//! CI benchmark actions (`{"entries": {"<suite>": [CommitEntry, ...]}}`).

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod commit;
pub mod error;
pub mod record;
pub mod unit;

pub use commit::{CommitEntry, CommitEntryBuilder, CommitInfo, Identity};
pub use error::{Error, NotFoundError, PersistenceError, Result, ValidationError};
pub use record::{BenchmarkRecord, RunAnnotation};
pub use unit::{primary_unit, Measure, MetricKind, Polarity};
