// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-benchmark polarity resolution.

use std::collections::BTreeMap;

use bench_history_core::{BenchmarkRecord, Polarity};
use serde::{Deserialize, Serialize};

/// Decides which direction is a regression for each benchmark.
///
/// Lookup order: an override for the exact record name, then `default`, then
/// the polarity implied by the record's unit (throughput units are
/// higher-is-better, everything else higher-is-worse).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolarityMap {
    /// Polarity for benchmarks without an override. `None` infers it from
    /// the unit.
    pub default: Option<Polarity>,
    /// Per-benchmark overrides.
    pub overrides: BTreeMap<String, Polarity>,
}

impl PolarityMap {
    /// Map that always answers `polarity`.
    pub fn uniform(polarity: Polarity) -> Self {
        Self {
            default: Some(polarity),
            overrides: BTreeMap::new(),
        }
    }

    /// Add an override.
    pub fn with_override(mut self, benchmark: impl Into<String>, polarity: Polarity) -> Self {
        self.overrides.insert(benchmark.into(), polarity);
        self
    }

    /// Give every name in `benchmarks` the same override. Blank names are
    /// skipped and surrounding whitespace is trimmed.
    pub fn with_overrides<I, S>(mut self, benchmarks: I, polarity: Polarity) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in benchmarks {
            let name = name.as_ref().trim();
            if !name.is_empty() {
                self.overrides.insert(name.to_string(), polarity);
            }
        }
        self
    }

    /// Polarity for `record`.
    pub fn resolve(&self, record: &BenchmarkRecord) -> Polarity {
        self.overrides
            .get(&record.name)
            .copied()
            .or(self.default)
            .unwrap_or_else(|| record.metric_kind().default_polarity())
    }
}
