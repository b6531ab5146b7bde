// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! The query engine.
//!
//! Every query works on one [`SeriesSnapshot`], so results are consistent
//! even while the series is being appended to.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bench_history_core::{
    BenchmarkRecord, CommitEntry, NotFoundError, Polarity, Result, ValidationError,
};
use bench_history_storage::{HistoryStore, SeriesSnapshot};
use tracing::debug;

use crate::polarity::PolarityMap;
use crate::report::{
    BenchmarkChange, BenchmarkSummary, CommitDiff, RegressionResult, SeriesSummary,
};

/// Read-only queries over a [`HistoryStore`].
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<HistoryStore>,
}

impl QueryEngine {
    /// Create an engine reading from `store`.
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// The last `n` entries by run time, most recent last.
    ///
    /// `n == 0` is an empty result, not an error.
    pub async fn latest(&self, series: &str, n: usize) -> Result<Vec<CommitEntry>> {
        record_query("latest");
        if n == 0 {
            return Ok(Vec::new());
        }
        let snapshot = self.store.get_series(series).await?;
        let skip = snapshot.len().saturating_sub(n);
        Ok(snapshot.entries()[skip..].to_vec())
    }

    /// Entries with `from <= date <= to`, in run-time order.
    ///
    /// `from > to` is an empty result, not an error.
    pub async fn range(&self, series: &str, from: i64, to: i64) -> Result<Vec<CommitEntry>> {
        record_query("range");
        if from > to {
            return Ok(Vec::new());
        }
        let snapshot = self.store.get_series(series).await?;
        let entries = snapshot.entries();
        let start = entries.partition_point(|entry| entry.date < from);
        let end = entries.partition_point(|entry| entry.date <= to);
        Ok(entries[start..end].to_vec())
    }

    /// Compare the most recent value of `benchmark` with its value at
    /// `baseline_commit`.
    ///
    /// `polarity` of `None` infers it from the benchmark's unit.
    pub async fn regression_check(
        &self,
        series: &str,
        benchmark: &str,
        baseline_commit: &str,
        threshold_ratio: f64,
        polarity: Option<Polarity>,
    ) -> Result<RegressionResult> {
        record_query("regression");
        validate_threshold(threshold_ratio)?;

        let snapshot = self.store.get_series(series).await?;
        let baseline_entry = find_commit(&snapshot, baseline_commit)?;
        let baseline = baseline_entry
            .bench(benchmark)
            .ok_or_else(|| NotFoundError::Benchmark {
                scope: format!("{series}@{baseline_commit}"),
                benchmark: benchmark.to_string(),
            })?;
        if baseline.value == 0.0 {
            return Err(ValidationError::new(
                "baseline",
                format!("`{benchmark}` is zero at {baseline_commit}; no relative change exists"),
            )
            .into());
        }

        // The baseline entry carries the benchmark, so this always finds one.
        let (current_entry, current) = snapshot
            .iter()
            .rev()
            .find_map(|entry| entry.bench(benchmark).map(|record| (entry, record)))
            .unwrap_or((baseline_entry, baseline));

        let polarity = polarity.unwrap_or_else(|| PolarityMap::default().resolve(current));
        let delta = relative_change(baseline.value, current.value);
        let regressed = is_worse(delta, threshold_ratio, polarity);

        debug!(
            series,
            benchmark,
            baseline = baseline_commit,
            current = %current_entry.id(),
            delta,
            regressed,
            "Regression check"
        );

        Ok(RegressionResult {
            series: series.to_string(),
            benchmark: benchmark.to_string(),
            unit: current.unit.clone(),
            baseline_commit: baseline_commit.to_string(),
            current_commit: current_entry.id().to_string(),
            baseline_value: baseline.value,
            current_value: current.value,
            delta,
            threshold: threshold_ratio,
            polarity,
            regressed,
        })
    }

    /// Compare every benchmark between two commits of a series.
    pub async fn diff_commits(
        &self,
        series: &str,
        baseline_commit: &str,
        candidate_commit: &str,
        threshold_ratio: f64,
        polarities: &PolarityMap,
    ) -> Result<CommitDiff> {
        record_query("diff");
        validate_threshold(threshold_ratio)?;

        let snapshot = self.store.get_series(series).await?;
        let baseline = find_commit(&snapshot, baseline_commit)?;
        let candidate = find_commit(&snapshot, candidate_commit)?;

        let baseline_records: BTreeMap<&str, &BenchmarkRecord> = baseline
            .benches
            .iter()
            .map(|record| (record.name.as_str(), record))
            .collect();
        let candidate_records: BTreeMap<&str, &BenchmarkRecord> = candidate
            .benches
            .iter()
            .map(|record| (record.name.as_str(), record))
            .collect();

        let mut diff = CommitDiff {
            series: series.to_string(),
            baseline_commit: baseline_commit.to_string(),
            candidate_commit: candidate_commit.to_string(),
            threshold: threshold_ratio,
            regressions: Vec::new(),
            improvements: Vec::new(),
            unchanged: 0,
            new_benchmarks: Vec::new(),
            missing_benchmarks: Vec::new(),
            incomparable: Vec::new(),
        };

        for (name, record) in &candidate_records {
            let Some(before) = baseline_records.get(name) else {
                diff.new_benchmarks.push(name.to_string());
                continue;
            };
            if before.value == 0.0 {
                diff.incomparable.push(name.to_string());
                continue;
            }

            let polarity = polarities.resolve(record);
            let change = BenchmarkChange {
                benchmark: name.to_string(),
                unit: record.unit.clone(),
                baseline: before.value,
                candidate: record.value,
                delta: relative_change(before.value, record.value),
                polarity,
            };
            if is_worse(change.delta, threshold_ratio, polarity) {
                diff.regressions.push(change);
            } else if is_worse(-change.delta, threshold_ratio, polarity) {
                diff.improvements.push(change);
            } else {
                diff.unchanged += 1;
            }
        }

        diff.missing_benchmarks = baseline_records
            .keys()
            .filter(|name| !candidate_records.contains_key(*name))
            .map(|name| name.to_string())
            .collect();

        debug!(
            series,
            baseline = baseline_commit,
            candidate = candidate_commit,
            regressions = diff.regressions.len(),
            improvements = diff.improvements.len(),
            "Commit diff"
        );
        Ok(diff)
    }

    /// Per-benchmark overview of a series.
    pub async fn summary(&self, series: &str) -> Result<SeriesSummary> {
        record_query("summary");
        let snapshot = self.store.get_series(series).await?;

        let mut rows: BTreeMap<&str, BenchmarkSummary> = BTreeMap::new();
        for entry in snapshot.iter() {
            for record in &entry.benches {
                rows.entry(record.name.as_str())
                    .and_modify(|row| {
                        row.samples += 1;
                        row.previous = Some(row.latest);
                        row.latest = record.value;
                        row.unit.clone_from(&record.unit);
                        row.min = row.min.min(record.value);
                        row.max = row.max.max(record.value);
                    })
                    .or_insert_with(|| BenchmarkSummary {
                        benchmark: record.name.clone(),
                        unit: record.unit.clone(),
                        samples: 1,
                        latest: record.value,
                        previous: None,
                        min: record.value,
                        max: record.value,
                    });
            }
        }

        let entries = snapshot.entries();
        Ok(SeriesSummary {
            series: series.to_string(),
            entries: entries.len(),
            first_date: entries.first().map(|entry| entry.date),
            last_date: entries.last().map(|entry| entry.date),
            latest_commit: entries.last().map(|entry| entry.id().to_string()),
            benchmarks: rows.into_values().collect(),
        })
    }

    /// Names of all series.
    pub fn series_names(&self) -> BTreeSet<String> {
        record_query("series");
        self.store.list_series_names()
    }
}

fn record_query(operation: &'static str) {
    metrics::counter!("bench_history_query_total", "operation" => operation).increment(1);
}

fn find_commit<'a>(snapshot: &'a SeriesSnapshot, commit: &str) -> Result<&'a CommitEntry> {
    snapshot.find(commit).ok_or_else(|| {
        NotFoundError::Commit {
            series: snapshot.name().to_string(),
            commit: commit.to_string(),
        }
        .into()
    })
}

fn validate_threshold(threshold_ratio: f64) -> std::result::Result<(), ValidationError> {
    if !threshold_ratio.is_finite() || threshold_ratio < 0.0 {
        return Err(ValidationError::new(
            "threshold_ratio",
            format!("{threshold_ratio} is not a non-negative finite ratio"),
        ));
    }
    Ok(())
}

fn relative_change(baseline: f64, current: f64) -> f64 {
    (current - baseline) / baseline.abs()
}

fn is_worse(delta: f64, threshold_ratio: f64, polarity: Polarity) -> bool {
    match polarity {
        Polarity::HigherIsWorse => delta > threshold_ratio,
        Polarity::HigherIsBetter => -delta > threshold_ratio,
    }
}
