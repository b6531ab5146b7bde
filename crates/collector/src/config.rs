// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ingestion settings.

use serde::{Deserialize, Serialize};

/// Ingestion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Keep a composite record next to the single-metric records exploded
    /// from it. Dashboards written by older producers chart the combined
    /// record, so it is kept unless turned off.
    pub keep_composite: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            keep_composite: true,
        }
    }
}
