// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark record types.

use serde::{Deserialize, Serialize};

use crate::unit::{self, Measure, MetricKind};

/// A single named metric value for one CI run.
///
/// Records are immutable once ingested; a re-run of the same commit replaces
/// the whole [`crate::CommitEntry`] rather than editing records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// Benchmark name, unique within one commit's result set.
    pub name: String,
    /// Measured value.
    pub value: f64,
    /// Unit of `value`; may be a composite Go benchmark unit.
    #[serde(default)]
    pub unit: String,
    /// Free-form annotation such as `"591492 times\n4 procs"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl BenchmarkRecord {
    /// Create a new record without annotation.
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            extra: None,
        }
    }

    /// Attach an annotation.
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Whether the unit packs several metrics.
    pub fn is_composite(&self) -> bool {
        unit::is_composite(&self.unit)
    }

    /// What the record's value measures.
    ///
    /// For composite records this is the kind of the primary segment.
    pub fn metric_kind(&self) -> MetricKind {
        MetricKind::classify(unit::primary_unit(&self.unit))
    }

    /// All measures carried by this record, one for plain units.
    pub fn measures(&self) -> Result<Vec<Measure>, String> {
        Ok(unit::parse_composite(self.value, &self.unit)?.unwrap_or_else(|| {
            vec![Measure {
                value: self.value,
                unit: self.unit.clone(),
            }]
        }))
    }

    /// Parsed run annotation.
    pub fn annotation(&self) -> RunAnnotation {
        self.extra
            .as_deref()
            .map(RunAnnotation::parse)
            .unwrap_or_default()
    }
}

/// Structured view of a record's `extra` text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAnnotation {
    /// Number of iterations the harness ran (`N times`).
    pub iterations: Option<u64>,
    /// Parallelism the harness used (`N procs`).
    pub procs: Option<u32>,
}

impl RunAnnotation {
    /// Parse `"591492 times\n4 procs"`-style text. Unknown lines are ignored.
    pub fn parse(text: &str) -> Self {
        let mut annotation = Self::default();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let (Some(number), Some(label)) = (parts.next(), parts.next()) else {
                continue;
            };
            match label {
                "times" => annotation.iterations = number.parse().ok(),
                "procs" => annotation.procs = number.parse().ok(),
                _ => {}
            }
        }
        annotation
    }
}
