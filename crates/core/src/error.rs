// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy.
//!
//! Three families, none of them fatal to the process:
//!
//! - [`ValidationError`]: malformed input, the caller fixes and resubmits.
//! - [`PersistenceError`]: durable storage failed; in-memory state is intact
//!   and only the flush needs retrying.
//! - [`NotFoundError`]: a query referenced an unknown series, commit or
//!   benchmark.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type shared across bench-history crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Durable storage failure.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Unknown series, commit or benchmark.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

impl Error {
    /// Shortcut for a [`ValidationError`] on `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, message))
    }

    /// Whether this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether this is a persistence error.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for bench-history operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed input, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// Path of the offending field, e.g. `benches[2].value`.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Durable storage failure.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the storage medium failed.
    #[error("storage I/O error at {path:?}: {source}")]
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The persisted document could not be encoded or decoded.
    #[error("history document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The flush did not complete in time.
    #[error("flush timed out after {0:?}")]
    Timeout(Duration),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl PersistenceError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A query referenced something the store does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    /// Unknown series name.
    #[error("series not found: {0}")]
    Series(String),

    /// Commit id absent from the series.
    #[error("commit {commit} not found in series {series}")]
    Commit {
        /// Series that was searched.
        series: String,
        /// The missing commit id.
        commit: String,
    },

    /// Benchmark name absent from the series or commit.
    #[error("benchmark {benchmark} not found in {scope}")]
    Benchmark {
        /// Where the lookup happened (series name or commit id).
        scope: String,
        /// The missing benchmark name.
        benchmark: String,
    },
}
