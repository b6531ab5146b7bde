// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Units, metric kinds and polarity.
//!
//! Go benchmark output packs several metrics into one unit string, e.g.
//! `"ns/op\t 91.00 payload_bytes/op\t 184 B/op\t 3 allocs/op"`. The first
//! segment is the unit of the record's own value; each following segment is
//! `<number> <unit>`. [`parse_composite`] splits such a string into
//! [`Measure`]s so that ingestion can store one typed record per metric.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What a unit measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Elapsed time per operation (`ns/op`, `ms`, ...).
    Time,
    /// Bytes per operation (`B/op`, `payload_bytes/op`, ...).
    Bytes,
    /// Allocation count per operation (`allocs/op`).
    Allocations,
    /// A rate (`MB/s`, `ops/s`, ...).
    Throughput,
    /// Anything else.
    Other,
}

impl MetricKind {
    /// Classify a single (non-composite) unit string.
    pub fn classify(unit: &str) -> Self {
        let unit = unit.trim().to_ascii_lowercase();
        if unit.is_empty() {
            return Self::Other;
        }
        if unit.ends_with("/s") || unit.ends_with("/sec") {
            return Self::Throughput;
        }

        let base = unit.strip_suffix("/op").unwrap_or(&unit);
        match base {
            "ns" | "us" | "µs" | "μs" | "ms" | "s" | "sec" | "seconds" => Self::Time,
            "b" | "kb" | "mb" | "gb" | "bytes" => Self::Bytes,
            "allocs" | "allocations" => Self::Allocations,
            _ if base.ends_with("bytes") || base.ends_with("_b") => Self::Bytes,
            _ if base.ends_with("allocs") => Self::Allocations,
            _ => Self::Other,
        }
    }

    /// Direction in which this kind of metric gets worse.
    pub fn default_polarity(&self) -> Polarity {
        match self {
            Self::Throughput => Polarity::HigherIsBetter,
            _ => Polarity::HigherIsWorse,
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Bytes => write!(f, "bytes"),
            Self::Allocations => write!(f, "allocations"),
            Self::Throughput => write!(f, "throughput"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Whether a larger value is a regression or an improvement.
///
/// Serializes as `higher_is_worse` / `higher_is_better`; deserializes through
/// [`FromStr`], so every spelling it accepts works in JSON and query strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Polarity {
    /// Latency-like metrics: growth is a regression.
    #[default]
    HigherIsWorse,
    /// Throughput-like metrics: shrinkage is a regression.
    HigherIsBetter,
}

impl FromStr for Polarity {
    type Err = String;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string.to_ascii_lowercase().replace('-', "_").as_str() {
            "higher_is_worse" | "lower_is_better" | "smaller_is_better" => {
                Ok(Self::HigherIsWorse)
            }
            "higher_is_better" | "bigger_is_better" => Ok(Self::HigherIsBetter),
            other => Err(format!(
                "Unknown polarity `{other}`. Supported: higher_is_worse, higher_is_better"
            )),
        }
    }
}

impl TryFrom<String> for Polarity {
    type Error = String;

    fn try_from(string: String) -> Result<Self, Self::Error> {
        string.parse()
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HigherIsWorse => write!(f, "higher_is_worse"),
            Self::HigherIsBetter => write!(f, "higher_is_better"),
        }
    }
}

/// One metric extracted from a (possibly composite) unit string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Numeric value.
    pub value: f64,
    /// Single-metric unit, e.g. `B/op`.
    pub unit: String,
}

impl Measure {
    /// What this measure's unit describes.
    pub fn kind(&self) -> MetricKind {
        MetricKind::classify(&self.unit)
    }
}

/// Whether `unit` packs more than one metric.
pub fn is_composite(unit: &str) -> bool {
    unit.contains('\t')
}

/// Unit of the record's own value: the first segment of a composite unit,
/// or the whole unit otherwise.
pub fn primary_unit(unit: &str) -> &str {
    unit.split('\t').next().unwrap_or_default().trim()
}

/// Split a composite unit string into measures.
///
/// `primary_value` is the record's own value and belongs to the first
/// segment. Returns `Ok(None)` for a plain single-metric unit. A segment that
/// is not `<number> <unit>` is reported as `Err` with a description.
pub fn parse_composite(primary_value: f64, unit: &str) -> Result<Option<Vec<Measure>>, String> {
    if !is_composite(unit) {
        return Ok(None);
    }

    let mut segments = unit.split('\t').map(str::trim).filter(|s| !s.is_empty());
    let primary_unit = segments
        .next()
        .ok_or_else(|| "composite unit has no primary segment".to_string())?;

    let mut measures = vec![Measure {
        value: primary_value,
        unit: primary_unit.to_string(),
    }];

    for segment in segments {
        let mut parts = segment.split_whitespace();
        let (Some(number), Some(suffix), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("segment `{segment}` is not `<number> <unit>`"));
        };
        let value: f64 = number
            .parse()
            .map_err(|_| format!("segment `{segment}` has a non-numeric value"))?;
        if !value.is_finite() {
            return Err(format!("segment `{segment}` has a non-finite value"));
        }
        measures.push(Measure {
            value,
            unit: suffix.to_string(),
        });
    }

    Ok(Some(measures))
}
