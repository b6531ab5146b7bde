// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Composite unit normalization.
//!
//! Go benchmark harnesses report several metrics per benchmark in one unit
//! string:
//!
//! ```text
//! {"name": "BenchmarkParse", "value": 1920,
//!  "unit": "ns/op\t 91.00 payload_bytes/op\t 184 B/op\t 3 allocs/op"}
//! ```
//!
//! Such a record is exploded into one record per metric named
//! `"<name> - <unit>"` (`BenchmarkParse - ns/op`, `BenchmarkParse - B/op`,
//! ...), each with a plain unit and the original annotation.

use std::collections::HashSet;

use bench_history_core::{unit, BenchmarkRecord, CommitEntry};

use crate::config::IngestConfig;

/// Name of the single-metric record exploded from `name` for `unit`.
pub fn exploded_name(name: &str, unit: &str) -> String {
    format!("{name} - {unit}")
}

/// Explode composite records of a validated entry.
///
/// Exploded records the producer already supplied are not duplicated.
/// Composite segments that fail to parse are left untouched; validation
/// rejects them first.
pub fn normalize_entry(mut entry: CommitEntry, config: &IngestConfig) -> CommitEntry {
    if !entry.benches.iter().any(BenchmarkRecord::is_composite) {
        return entry;
    }

    let mut seen: HashSet<String> = entry.benches.iter().map(|b| b.name.clone()).collect();
    let mut benches = Vec::with_capacity(entry.benches.len() * 4);

    for record in std::mem::take(&mut entry.benches) {
        let measures = match unit::parse_composite(record.value, &record.unit) {
            Ok(Some(measures)) => measures,
            _ => {
                benches.push(record);
                continue;
            }
        };

        let exploded: Vec<BenchmarkRecord> = measures
            .into_iter()
            .filter_map(|measure| {
                let name = exploded_name(&record.name, &measure.unit);
                seen.insert(name.clone()).then(|| BenchmarkRecord {
                    name,
                    value: measure.value,
                    unit: measure.unit,
                    extra: record.extra.clone(),
                })
            })
            .collect();

        if config.keep_composite {
            benches.push(record);
        }
        benches.extend(exploded);
    }

    entry.benches = benches;
    entry
}
