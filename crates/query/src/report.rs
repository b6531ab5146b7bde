// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Query result types.

use bench_history_core::Polarity;
use serde::Serialize;

/// Outcome of a regression check for one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    /// Series checked.
    pub series: String,
    /// Benchmark checked.
    pub benchmark: String,
    /// Unit of both values.
    pub unit: String,
    /// Commit the comparison starts from.
    pub baseline_commit: String,
    /// Most recent commit carrying the benchmark.
    pub current_commit: String,
    /// Value at the baseline commit.
    pub baseline_value: f64,
    /// Value at the current commit.
    pub current_value: f64,
    /// `(current - baseline) / |baseline|`.
    pub delta: f64,
    /// Allowed relative change.
    pub threshold: f64,
    /// Direction that counts as worse.
    pub polarity: Polarity,
    /// Whether the change exceeds the threshold in the worse direction.
    pub regressed: bool,
}

/// Relative change of one benchmark between two commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkChange {
    /// Benchmark name.
    pub benchmark: String,
    /// Unit of the candidate record.
    pub unit: String,
    /// Baseline value.
    pub baseline: f64,
    /// Candidate value.
    pub candidate: f64,
    /// `(candidate - baseline) / |baseline|`.
    pub delta: f64,
    /// Direction that counts as worse.
    pub polarity: Polarity,
}

/// Every benchmark compared between two commits of a series.
///
/// Lists are sorted by benchmark name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitDiff {
    /// Series compared.
    pub series: String,
    /// Baseline commit id.
    pub baseline_commit: String,
    /// Candidate commit id.
    pub candidate_commit: String,
    /// Allowed relative change.
    pub threshold: f64,
    /// Changes beyond the threshold in the worse direction.
    pub regressions: Vec<BenchmarkChange>,
    /// Changes beyond the threshold in the better direction.
    pub improvements: Vec<BenchmarkChange>,
    /// Number of benchmarks within the threshold.
    pub unchanged: usize,
    /// Benchmarks only the candidate has.
    pub new_benchmarks: Vec<String>,
    /// Benchmarks only the baseline has.
    pub missing_benchmarks: Vec<String>,
    /// Benchmarks whose baseline value is zero, so no ratio exists.
    pub incomparable: Vec<String>,
}

impl CommitDiff {
    /// Whether any benchmark regressed.
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}

/// Per-benchmark overview of a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkSummary {
    /// Benchmark name.
    pub benchmark: String,
    /// Unit of the latest value.
    pub unit: String,
    /// Number of entries carrying the benchmark.
    pub samples: usize,
    /// Most recent value.
    pub latest: f64,
    /// Value in the entry before the most recent one carrying it.
    pub previous: Option<f64>,
    /// Smallest value seen.
    pub min: f64,
    /// Largest value seen.
    pub max: f64,
}

impl BenchmarkSummary {
    /// Relative change from `previous` to `latest`.
    pub fn change(&self) -> Option<f64> {
        self.previous
            .filter(|previous| *previous != 0.0)
            .map(|previous| (self.latest - previous) / previous.abs())
    }
}

/// Overview of a whole series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    /// Series name.
    pub series: String,
    /// Number of entries.
    pub entries: usize,
    /// Run time of the oldest entry.
    pub first_date: Option<i64>,
    /// Run time of the newest entry.
    pub last_date: Option<i64>,
    /// Commit of the newest entry.
    pub latest_commit: Option<String>,
    /// One row per benchmark name, sorted by name.
    pub benchmarks: Vec<BenchmarkSummary>,
}
