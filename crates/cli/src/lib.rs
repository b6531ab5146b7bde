// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI for bench-history.
//!
//! Every subcommand opens the history file given by `--history`, works on it
//! in memory, and writes it back only if something changed.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bench_history_collector::{IngestConfig, Ingestor};
use bench_history_core::{CommitEntry, Polarity};
use bench_history_query::{markdown, PolarityMap, QueryEngine};
use bench_history_storage::{
    FlushPolicy, HistoryDocument, HistoryStore, JsonFileBackend, SnapshotBackend, StorageFormat,
    StoreConfig,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

/// bench-history CLI.
#[derive(Parser, Debug)]
#[command(name = "bench-history")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// History file (`.json`, or `.js` for the dashboard `data.js` form).
    #[arg(long, global = true, env = "BENCH_HISTORY_PATH", default_value = "bench-history.json")]
    pub history: PathBuf,

    /// History file encoding; inferred from the extension when omitted.
    #[arg(long, global = true)]
    pub format: Option<StorageFormat>,

    /// Verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge an existing dashboard document (JSON or `data.js`) into the history.
    Import {
        /// Document to import.
        source: PathBuf,

        /// Store only the single-metric records exploded from composite units.
        #[arg(long)]
        drop_composite: bool,
    },

    /// Ingest one CI run (a commit entry as JSON) into a series.
    Ingest {
        /// Series name.
        series: String,

        /// File holding the entry; `-` reads standard input.
        #[arg(short, long, default_value = "-")]
        file: PathBuf,

        /// Store only the single-metric records exploded from composite units.
        #[arg(long)]
        drop_composite: bool,
    },

    /// List series, or summarize one.
    Series {
        /// Series to summarize.
        name: Option<String>,

        /// Print the summary as a Markdown table.
        #[arg(long)]
        markdown: bool,
    },

    /// Print the most recent entries of a series.
    Latest {
        /// Series name.
        series: String,

        /// Number of entries; zero or less prints none.
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        n: i64,
    },

    /// Print entries whose run time lies in an inclusive range.
    Range {
        /// Series name.
        series: String,

        /// Lower bound, epoch milliseconds.
        #[arg(long, allow_negative_numbers = true)]
        from: i64,

        /// Upper bound, epoch milliseconds.
        #[arg(long, allow_negative_numbers = true)]
        to: i64,
    },

    /// Check one benchmark's latest value against a baseline commit.
    Regression {
        /// Series name.
        series: String,

        /// Benchmark name.
        benchmark: String,

        /// Baseline commit id.
        #[arg(short, long)]
        baseline: String,

        /// Allowed relative change, e.g. `0.2` for 20%.
        #[arg(short, long, default_value_t = 0.2)]
        threshold: f64,

        /// `higher_is_worse` or `higher_is_better`; inferred from the unit when omitted.
        #[arg(short, long)]
        polarity: Option<Polarity>,

        /// Exit with status 2 when the benchmark regressed.
        #[arg(long)]
        fail_on_regression: bool,
    },

    /// Compare every benchmark between two commits.
    Diff {
        /// Series name.
        series: String,

        /// Baseline commit id.
        #[arg(short, long)]
        baseline: String,

        /// Candidate commit id.
        #[arg(short, long)]
        candidate: String,

        /// Allowed relative change, e.g. `0.2` for 20%.
        #[arg(short, long, default_value_t = 0.2)]
        threshold: f64,

        /// Polarity for benchmarks without an override; inferred from each unit when omitted.
        #[arg(short, long)]
        polarity: Option<Polarity>,

        /// Benchmark where larger values are better. Repeatable.
        #[arg(long = "higher-is-better", value_name = "NAME")]
        higher_is_better: Vec<String>,

        /// Benchmark where larger values are worse. Repeatable.
        #[arg(long = "higher-is-worse", value_name = "NAME")]
        higher_is_worse: Vec<String>,

        /// Print a Markdown report instead of JSON.
        #[arg(long)]
        markdown: bool,

        /// Exit with status 2 when any benchmark regressed.
        #[arg(long)]
        fail_on_regression: bool,
    },

    /// Write the history to another file or encoding.
    Export {
        /// Destination file.
        output: PathBuf,

        /// Destination encoding; inferred from the extension when omitted.
        #[arg(long = "to")]
        to_format: Option<StorageFormat>,
    },
}

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to report.
    Success,
    /// A regression was found and `--fail-on-regression` was given.
    RegressionFound,
}

/// Run a parsed command.
///
/// # Returns
///
/// Returns the outcome on success, or an error if the command fails.
pub async fn run(cli: Cli) -> Result<Outcome> {
    let format = cli
        .format
        .unwrap_or_else(|| StorageFormat::from_path(&cli.history));

    let imported = match &cli.command {
        Commands::Import { source, .. } => Some(read_document(source).await?),
        _ => None,
    };
    let backend = Arc::new(JsonFileBackend::new(&cli.history, format));
    let config = StoreConfig {
        repo_url: imported.as_ref().and_then(|document| document.repo_url.clone()),
        ..StoreConfig::with_policy(FlushPolicy::Manual)
    };
    let store = HistoryStore::open(backend, config)
        .await
        .with_context(|| format!("failed to open history {}", cli.history.display()))?;

    let outcome = execute(cli.command, Arc::clone(&store), imported).await;
    store
        .shutdown()
        .await
        .with_context(|| format!("failed to write history {}", cli.history.display()))?;
    outcome
}

async fn execute(
    command: Commands,
    store: Arc<HistoryStore>,
    imported: Option<HistoryDocument>,
) -> Result<Outcome> {
    let engine = QueryEngine::new(Arc::clone(&store));

    match command {
        Commands::Import {
            source,
            drop_composite,
        } => {
            let document = imported.unwrap_or_default();
            let ingestor = Ingestor::new(store, ingest_config(drop_composite));
            let report = ingestor.import_document(document).await?;
            info!(
                source = %source.display(),
                imported = report.total_imported(),
                rejected = report.rejected.len(),
                "Import finished"
            );
            print_json(&report)?;
        }
        Commands::Ingest {
            series,
            file,
            drop_composite,
        } => {
            let text = read_input(&file)?;
            let entry: CommitEntry =
                serde_json::from_str(&text).context("input is not a commit entry")?;
            let ingestor = Ingestor::new(store, ingest_config(drop_composite));
            let position = ingestor.ingest(&series, entry).await?;
            print_json(&serde_json::json!({ "series": series, "position": position }))?;
        }
        Commands::Series { name: None, .. } => {
            print_json(&engine.series_names())?;
        }
        Commands::Series {
            name: Some(name),
            markdown,
        } => {
            let summary = engine.summary(&name).await?;
            if markdown {
                print!("{}", markdown::series_summary(&summary));
            } else {
                print_json(&summary)?;
            }
        }
        Commands::Latest { series, n } => {
            let n = usize::try_from(n).unwrap_or(0);
            print_json(&engine.latest(&series, n).await?)?;
        }
        Commands::Range { series, from, to } => {
            print_json(&engine.range(&series, from, to).await?)?;
        }
        Commands::Regression {
            series,
            benchmark,
            baseline,
            threshold,
            polarity,
            fail_on_regression,
        } => {
            let result = engine
                .regression_check(&series, &benchmark, &baseline, threshold, polarity)
                .await?;
            print_json(&result)?;
            if fail_on_regression && result.regressed {
                return Ok(Outcome::RegressionFound);
            }
        }
        Commands::Diff {
            series,
            baseline,
            candidate,
            threshold,
            polarity,
            higher_is_better,
            higher_is_worse,
            markdown,
            fail_on_regression,
        } => {
            let polarities = PolarityMap {
                default: polarity,
                ..PolarityMap::default()
            }
            .with_overrides(&higher_is_better, Polarity::HigherIsBetter)
            .with_overrides(&higher_is_worse, Polarity::HigherIsWorse);
            let diff = engine
                .diff_commits(&series, &baseline, &candidate, threshold, &polarities)
                .await?;
            if markdown {
                print!("{}", markdown::diff_report(&diff));
            } else {
                print_json(&diff)?;
            }
            if fail_on_regression && diff.has_regressions() {
                return Ok(Outcome::RegressionFound);
            }
        }
        Commands::Export { output, to_format } => {
            let format = to_format.unwrap_or_else(|| StorageFormat::from_path(&output));
            let document = store.document().await;
            let entries = document.entry_count();
            JsonFileBackend::new(&output, format)
                .save(&document)
                .await
                .with_context(|| format!("failed to export to {}", output.display()))?;
            info!(output = %output.display(), %format, entries, "Export finished");
        }
    }

    Ok(Outcome::Success)
}

fn ingest_config(drop_composite: bool) -> IngestConfig {
    IngestConfig {
        keep_composite: !drop_composite,
    }
}

async fn read_document(path: &Path) -> Result<HistoryDocument> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    HistoryDocument::decode(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read standard input")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const ENTRY: &str = r#"{
        "commit": {
            "id": "abc123",
            "timestamp": "2025-01-01T00:00:00Z",
            "author": {"name": "Dev", "email": "dev@example.com"},
            "committer": {"name": "Dev", "email": "dev@example.com"}
        },
        "date": 1000,
        "tool": "go",
        "benches": [{"name": "BenchX", "value": 100, "unit": "ns/op"}]
    }"#;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_regression() {
        let cli = Cli::try_parse_from([
            "bench-history",
            "--history",
            "dev/bench/data.js",
            "regression",
            "suite",
            "BenchX",
            "--baseline",
            "abc123",
            "--polarity",
            "higher-is-better",
            "--fail-on-regression",
        ])
        .unwrap();

        assert_eq!(cli.history, PathBuf::from("dev/bench/data.js"));
        match cli.command {
            Commands::Regression {
                threshold,
                polarity,
                fail_on_regression,
                ..
            } => {
                assert_eq!(threshold, 0.2);
                assert_eq!(polarity, Some(Polarity::HigherIsBetter));
                assert!(fail_on_regression);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_diff_polarity_overrides() {
        let cli = Cli::try_parse_from([
            "bench-history",
            "diff",
            "suite",
            "-b",
            "abc123",
            "-c",
            "def456",
            "--higher-is-better",
            "BenchX",
            "--higher-is-better",
            "BenchY - MB/s",
            "--higher-is-worse",
            "BenchZ",
        ])
        .unwrap();

        match cli.command {
            Commands::Diff {
                polarity,
                higher_is_better,
                higher_is_worse,
                ..
            } => {
                assert_eq!(polarity, None);
                assert_eq!(higher_is_better, vec!["BenchX", "BenchY - MB/s"]);
                assert_eq!(higher_is_worse, vec!["BenchZ"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_negative_latest() {
        let cli = Cli::try_parse_from(["bench-history", "latest", "suite", "-n", "-3"]).unwrap();
        assert!(matches!(cli.command, Commands::Latest { n: -3, .. }));
    }

    #[tokio::test]
    async fn test_ingest_then_regression_then_export() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history.json");
        let entry_path = dir.path().join("entry.json");

        std::fs::write(&entry_path, ENTRY).unwrap();
        let ingest = Cli::try_parse_from([
            "bench-history",
            "--history",
            history.to_str().unwrap(),
            "ingest",
            "suite",
            "--file",
            entry_path.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(run(ingest).await.unwrap(), Outcome::Success);

        let second = ENTRY
            .replace("abc123", "def456")
            .replace("\"date\": 1000", "\"date\": 2000")
            .replace("\"value\": 100", "\"value\": 150");
        std::fs::write(&entry_path, second).unwrap();
        let ingest = Cli::try_parse_from([
            "bench-history",
            "--history",
            history.to_str().unwrap(),
            "ingest",
            "suite",
            "-f",
            entry_path.to_str().unwrap(),
        ])
        .unwrap();
        run(ingest).await.unwrap();

        let regression = Cli::try_parse_from([
            "bench-history",
            "--history",
            history.to_str().unwrap(),
            "regression",
            "suite",
            "BenchX",
            "-b",
            "abc123",
            "--fail-on-regression",
        ])
        .unwrap();
        assert_eq!(run(regression).await.unwrap(), Outcome::RegressionFound);

        let diff = |overrides: &[&str]| {
            let mut args = vec![
                "bench-history",
                "--history",
                history.to_str().unwrap(),
                "diff",
                "suite",
                "-b",
                "abc123",
                "-c",
                "def456",
                "--fail-on-regression",
            ];
            args.extend_from_slice(overrides);
            Cli::try_parse_from(args).unwrap()
        };
        assert_eq!(run(diff(&[])).await.unwrap(), Outcome::RegressionFound);
        assert_eq!(
            run(diff(&["--higher-is-better", "BenchX"])).await.unwrap(),
            Outcome::Success
        );

        let exported = dir.path().join("data.js");
        let export = Cli::try_parse_from([
            "bench-history",
            "--history",
            history.to_str().unwrap(),
            "export",
            exported.to_str().unwrap(),
        ])
        .unwrap();
        run(export).await.unwrap();

        let text = std::fs::read_to_string(&exported).unwrap();
        assert!(text.starts_with("window.BENCHMARK_DATA = "));
        let document = HistoryDocument::decode(&text).unwrap();
        assert_eq!(document.entries["suite"].len(), 2);
    }

    #[tokio::test]
    async fn test_import_keeps_repo_url() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("data.js");
        let history = dir.path().join("history.json");
        std::fs::write(
            &source,
            format!(
                "window.BENCHMARK_DATA = {{\"repoUrl\": \"https://example.com/repo\", \"entries\": {{\"suite\": [{ENTRY}]}}}}"
            ),
        )
        .unwrap();

        let import = Cli::try_parse_from([
            "bench-history",
            "--history",
            history.to_str().unwrap(),
            "import",
            source.to_str().unwrap(),
        ])
        .unwrap();
        run(import).await.unwrap();

        let document = HistoryDocument::decode(&std::fs::read_to_string(&history).unwrap()).unwrap();
        assert_eq!(document.repo_url.as_deref(), Some("https://example.com/repo"));
        assert_eq!(document.entry_count(), 1);
    }
}
