// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Entry validation.
//!
//! Every check reports the path of the offending field, e.g.
//! `benches[2].value`, so producers can fix their output without guessing.

use std::collections::HashSet;

use bench_history_core::commit::{is_content_hash, MAX_COMMIT_ID_LEN, MIN_COMMIT_ID_LEN};
use bench_history_core::{unit, CommitEntry, ValidationError};

/// Validate a series name.
pub fn validate_series_name(series: &str) -> Result<(), ValidationError> {
    if series.trim().is_empty() {
        return Err(ValidationError::new("series", "series name must not be empty"));
    }
    Ok(())
}

/// Validate an entry before it is appended to `series`.
pub fn validate_entry(series: &str, entry: &CommitEntry) -> Result<(), ValidationError> {
    validate_series_name(series)?;

    if !is_content_hash(entry.id()) {
        return Err(ValidationError::new(
            "commit.id",
            format!(
                "`{}` is not a commit hash ({MIN_COMMIT_ID_LEN}-{MAX_COMMIT_ID_LEN} hex digits)",
                entry.id()
            ),
        ));
    }

    if entry.date < 0 || entry.date_time().is_none() {
        return Err(ValidationError::new(
            "date",
            format!("{} is not a valid epoch-millis run time", entry.date),
        ));
    }

    let mut names = HashSet::with_capacity(entry.benches.len());
    for (i, record) in entry.benches.iter().enumerate() {
        if record.name.trim().is_empty() {
            return Err(ValidationError::new(
                format!("benches[{i}].name"),
                "benchmark name must not be empty",
            ));
        }
        if !names.insert(record.name.as_str()) {
            return Err(ValidationError::new(
                format!("benches[{i}].name"),
                format!("duplicate benchmark `{}`", record.name),
            ));
        }
        if !record.value.is_finite() {
            return Err(ValidationError::new(
                format!("benches[{i}].value"),
                format!("`{}` has non-finite value {}", record.name, record.value),
            ));
        }
        unit::parse_composite(record.value, &record.unit)
            .map_err(|message| ValidationError::new(format!("benches[{i}].unit"), message))?;
    }

    Ok(())
}
