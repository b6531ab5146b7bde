// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Store configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// When appended entries reach durable storage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// The ingestor flushes before returning; persistence errors reach the caller.
    OnAppend,
    /// A background task flushes dirty state every `flush_interval`.
    #[default]
    Interval,
    /// Only explicit `flush()` and `shutdown()` persist.
    Manual,
}

impl FromStr for FlushPolicy {
    type Err = String;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string.to_lowercase().replace('-', "_").as_str() {
            "on_append" => Ok(Self::OnAppend),
            "interval" => Ok(Self::Interval),
            "manual" => Ok(Self::Manual),
            other => Err(format!(
                "Unknown flush policy `{other}`. Supported: on_append, interval, manual"
            )),
        }
    }
}

impl std::fmt::Display for FlushPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnAppend => write!(f, "on_append"),
            Self::Interval => write!(f, "interval"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Configuration for a [`crate::HistoryStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Flush policy.
    pub flush_policy: FlushPolicy,
    /// Background flush cadence for [`FlushPolicy::Interval`].
    pub flush_interval: Duration,
    /// Upper bound on a single snapshot write.
    pub flush_timeout: Duration,
    /// Repository URL written into the snapshot; overrides the loaded one.
    pub repo_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            flush_policy: FlushPolicy::default(),
            flush_interval: Duration::from_secs(30),
            flush_timeout: Duration::from_secs(10),
            repo_url: None,
        }
    }
}

impl StoreConfig {
    /// Config with a given flush policy and default timings.
    pub fn with_policy(flush_policy: FlushPolicy) -> Self {
        Self {
            flush_policy,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_policy_parse_and_display() {
        for policy in [FlushPolicy::OnAppend, FlushPolicy::Interval, FlushPolicy::Manual] {
            assert_eq!(policy.to_string().parse::<FlushPolicy>().unwrap(), policy);
        }
        assert_eq!("on-append".parse::<FlushPolicy>().unwrap(), FlushPolicy::OnAppend);
        assert!("sometimes".parse::<FlushPolicy>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.flush_policy, FlushPolicy::Interval);
        assert!(config.flush_timeout < config.flush_interval);
    }
}
