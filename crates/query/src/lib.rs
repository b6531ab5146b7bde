// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Bench History Query
//!
//! Read-side queries over a [`bench_history_storage::HistoryStore`]:
//!
//! - [`QueryEngine::latest`] and [`QueryEngine::range`] for charting
//! - [`QueryEngine::regression_check`] for a single benchmark against a
//!   baseline commit
//! - [`QueryEngine::diff_commits`] for every benchmark between two commits
//! - [`markdown`] renderers for CI comments
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use bench_history_query::QueryEngine;
//! # async fn example(store: Arc<bench_history_storage::HistoryStore>) -> bench_history_core::Result<()> {
//! let engine = QueryEngine::new(store);
//! let result = engine.regression_check("suite", "BenchX", "abc123", 0.2, None).await?;
//! if result.regressed {
//!     println!("{} regressed by {:.1}%", result.benchmark, result.delta * 100.0);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod engine;
pub mod markdown;
pub mod polarity;
pub mod report;

pub use engine::QueryEngine;
pub use polarity::PolarityMap;
pub use report::{
    BenchmarkChange, BenchmarkSummary, CommitDiff, RegressionResult, SeriesSummary,
};
