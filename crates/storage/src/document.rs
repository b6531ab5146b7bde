// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! The persisted history document and its on-disk encodings.
//!
//! Two encodings share one JSON shape:
//!
//! - `json`: the bare document object
//! - `data_js`: the same object assigned to `window.BENCHMARK_DATA`, which
//!   the dashboard page loads with a plain `<script>` tag

use std::collections::BTreeMap;
use std::str::FromStr;

use bench_history_core::{CommitEntry, PersistenceError};
use serde::{Deserialize, Serialize};

/// Prefix of the `data.js` encoding.
pub const DATA_JS_PREFIX: &str = "window.BENCHMARK_DATA = ";

const DATA_JS_GLOBAL: &str = "window.BENCHMARK_DATA";

/// Full benchmark history, keyed by series name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDocument {
    /// Epoch millis of the last successful flush.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
    /// Repository the history belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    /// Series name to entries, ordered by run time.
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<CommitEntry>>,
}

impl HistoryDocument {
    /// Total number of entries across all series.
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Decode either encoding. The `data.js` wrapper is detected by prefix.
    pub fn decode(text: &str) -> Result<Self, PersistenceError> {
        let text = text.trim();
        let json = match text.strip_prefix(DATA_JS_GLOBAL) {
            Some(rest) => {
                let rest = rest.trim_start();
                let rest = rest.strip_prefix('=').ok_or_else(|| {
                    PersistenceError::Backend(format!(
                        "`{DATA_JS_GLOBAL}` is not followed by an assignment"
                    ))
                })?;
                rest.trim().trim_end_matches(';')
            }
            None => text,
        };
        Ok(serde_json::from_str(json)?)
    }

    /// Encode with the given format. Output is pretty-printed for diffability.
    pub fn encode(&self, format: StorageFormat) -> Result<String, PersistenceError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(match format {
            StorageFormat::Json => json,
            StorageFormat::DataJs => format!("{DATA_JS_PREFIX}{json}\n"),
        })
    }
}

/// On-disk encoding of a [`HistoryDocument`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFormat {
    /// Bare JSON object.
    #[default]
    Json,
    /// JSON assigned to `window.BENCHMARK_DATA`.
    DataJs,
}

impl StorageFormat {
    /// Guess the format from a file extension, defaulting to JSON.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("js") => Self::DataJs,
            _ => Self::Json,
        }
    }
}

impl FromStr for StorageFormat {
    type Err = String;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string.to_lowercase().replace('-', "_").as_str() {
            "json" => Ok(Self::Json),
            "data_js" | "js" => Ok(Self::DataJs),
            string => Err(format!(
                "Unknown storage format `{string}`. Supported formats: {}",
                [Self::Json, Self::DataJs]
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<String>>()
                    .join(", ")
            )),
        }
    }
}

impl std::fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::DataJs => write!(f, "data_js"),
        }
    }
}
