// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown output for CI comments.
//!
//! Both renderers produce GitHub-flavored tables.

use std::fmt::{self, Display, Formatter};

use bench_history_core::primary_unit;
use chrono::{TimeZone, Utc};

use crate::report::{BenchmarkChange, CommitDiff, SeriesSummary};

/// Render a commit diff.
pub fn diff_report(diff: &CommitDiff) -> String {
    DiffReport(diff).to_string()
}

/// Render a series summary.
pub fn series_summary(summary: &SeriesSummary) -> String {
    SummaryReport(summary).to_string()
}

struct DiffReport<'a>(&'a CommitDiff);

impl Display for DiffReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let diff = self.0;
        writeln!(f, "# Benchmark Comparison: {}", diff.series)?;
        writeln!(f)?;
        writeln!(
            f,
            "Baseline `{}` vs candidate `{}` (threshold {})",
            short(&diff.baseline_commit),
            short(&diff.candidate_commit),
            percent(diff.threshold)
        )?;
        writeln!(f)?;

        if diff.has_regressions() {
            writeln!(f, "## :warning: Regressions")?;
        } else {
            writeln!(f, "## Regressions")?;
        }
        writeln!(f)?;
        changes_table(f, &diff.regressions)?;

        writeln!(f, "## Improvements")?;
        writeln!(f)?;
        changes_table(f, &diff.improvements)?;

        for (title, names) in [
            ("New benchmarks", &diff.new_benchmarks),
            ("Missing benchmarks", &diff.missing_benchmarks),
            ("Not comparable (zero baseline)", &diff.incomparable),
        ] {
            if names.is_empty() {
                continue;
            }
            writeln!(f, "## {title}")?;
            writeln!(f)?;
            for name in names {
                writeln!(f, "- `{name}`")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "---")?;
        writeln!(
            f,
            "{} regressed, {} improved, {} unchanged",
            diff.regressions.len(),
            diff.improvements.len(),
            diff.unchanged
        )
    }
}

fn changes_table(f: &mut Formatter<'_>, changes: &[BenchmarkChange]) -> fmt::Result {
    if changes.is_empty() {
        writeln!(f, "None.")?;
        return writeln!(f);
    }
    writeln!(f, "| Benchmark | Baseline | Candidate | Change |")?;
    writeln!(f, "|-----------|----------|-----------|--------|")?;
    for change in changes {
        let unit = primary_unit(&change.unit);
        writeln!(
            f,
            "| `{}` | {} {} | {} {} | {} |",
            change.benchmark,
            value(change.baseline),
            unit,
            value(change.candidate),
            unit,
            signed_percent(change.delta)
        )?;
    }
    writeln!(f)
}

struct SummaryReport<'a>(&'a SeriesSummary);

impl Display for SummaryReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        writeln!(f, "# Benchmark Summary: {}", summary.series)?;
        writeln!(f)?;
        if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
            writeln!(f, "Runs: {} ({} to {})", summary.entries, date(first), date(last))?;
        } else {
            writeln!(f, "Runs: {}", summary.entries)?;
        }
        if let Some(commit) = &summary.latest_commit {
            writeln!(f, "Latest commit: `{}`", short(commit))?;
        }
        writeln!(f)?;
        writeln!(f, "| Benchmark | Latest | Previous | Change | Min | Max | Samples |")?;
        writeln!(f, "|-----------|--------|----------|--------|-----|-----|---------|")?;
        for row in &summary.benchmarks {
            writeln!(
                f,
                "| `{}` | {} {} | {} | {} | {} | {} | {} |",
                row.benchmark,
                value(row.latest),
                primary_unit(&row.unit),
                row.previous.map(value).unwrap_or_else(|| "-".to_string()),
                row.change().map(signed_percent).unwrap_or_else(|| "-".to_string()),
                value(row.min),
                value(row.max),
                row.samples
            )?;
        }
        writeln!(f)?;
        writeln!(f, "---")?;
        writeln!(f, "Total benchmarks: {}", summary.benchmarks.len())
    }
}

fn short(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}

fn value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn signed_percent(ratio: f64) -> String {
    format!("{:+.1}%", ratio * 100.0)
}

fn date(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|date| date.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::BenchmarkSummary;
    use bench_history_core::Polarity;

    fn diff() -> CommitDiff {
        CommitDiff {
            series: "suite".to_string(),
            baseline_commit: "f91953a63a111eaeeb38e64b856ec959cf9c9b36".to_string(),
            candidate_commit: "def456".to_string(),
            threshold: 0.2,
            regressions: vec![BenchmarkChange {
                benchmark: "BenchX".to_string(),
                unit: "ns/op".to_string(),
                baseline: 100.0,
                candidate: 150.0,
                delta: 0.5,
                polarity: Polarity::HigherIsWorse,
            }],
            improvements: vec![],
            unchanged: 3,
            new_benchmarks: vec!["BenchNew".to_string()],
            missing_benchmarks: vec![],
            incomparable: vec![],
        }
    }

    #[test]
    fn test_diff_report() {
        let report = diff_report(&diff());
        assert!(report.starts_with("# Benchmark Comparison: suite"));
        assert!(report.contains("Baseline `f91953a` vs candidate `def456` (threshold 20.0%)"));
        assert!(report.contains(":warning: Regressions"));
        assert!(report.contains("| `BenchX` | 100 ns/op | 150 ns/op | +50.0% |"));
        assert!(report.contains("## Improvements\n\nNone."));
        assert!(report.contains("- `BenchNew`"));
        assert!(!report.contains("Missing benchmarks"));
        assert!(report.ends_with("1 regressed, 0 improved, 3 unchanged\n"));
    }

    #[test]
    fn test_series_summary() {
        let summary = SeriesSummary {
            series: "suite".to_string(),
            entries: 2,
            first_date: Some(0),
            last_date: Some(86_400_000),
            latest_commit: Some("def456".to_string()),
            benchmarks: vec![BenchmarkSummary {
                benchmark: "BenchX".to_string(),
                unit: "ns/op".to_string(),
                samples: 2,
                latest: 90.5,
                previous: Some(100.0),
                min: 90.5,
                max: 100.0,
            }],
        };
        let report = series_summary(&summary);
        assert!(report.contains("Runs: 2 (1970-01-01 00:00 UTC to 1970-01-02 00:00 UTC)"));
        assert!(report.contains("| `BenchX` | 90.50 ns/op | 100 | -9.5% | 90.50 | 100 | 2 |"));
        assert!(report.contains("Total benchmarks: 1"));
    }

    #[test]
    fn test_composite_unit_prints_primary_segment() {
        let unit = "ns/op\t     184 B/op\t       3 allocs/op";
        let summary = SeriesSummary {
            series: "suite".to_string(),
            entries: 1,
            first_date: None,
            last_date: None,
            latest_commit: None,
            benchmarks: vec![BenchmarkSummary {
                benchmark: "BenchmarkParse".to_string(),
                unit: unit.to_string(),
                samples: 1,
                latest: 1920.0,
                previous: None,
                min: 1920.0,
                max: 1920.0,
            }],
        };
        let report = series_summary(&summary);
        assert!(report.contains("| `BenchmarkParse` | 1920 ns/op | - | - | 1920 | 1920 | 1 |"));
        assert!(!report.contains('\t'));

        let mut diff = diff();
        diff.regressions[0].unit = unit.to_string();
        let report = diff_report(&diff);
        assert!(report.contains("| `BenchX` | 100 ns/op | 150 ns/op | +50.0% |"));
        assert!(!report.contains('\t'));
    }
}
