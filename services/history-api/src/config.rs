// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Service settings.
//!
//! Layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. `bench-history.toml` in the working directory, if present
//! 3. `BENCH_HISTORY__<SECTION>__<KEY>` environment variables, e.g.
//!    `BENCH_HISTORY__FLUSH__POLICY=on_append`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bench_history_collector::IngestConfig;
use bench_history_storage::{FlushPolicy, JsonFileBackend, StorageFormat, StoreConfig};
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

const CONFIG_FILE: &str = "bench-history";
const ENV_PREFIX: &str = "BENCH_HISTORY";

/// All service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Listener settings.
    pub server: ServerSettings,
    /// History file settings.
    pub storage: StorageSettings,
    /// Persistence cadence.
    pub flush: FlushSettings,
    /// Ingestion settings.
    pub ingest: IngestConfig,
    /// Log output settings.
    pub logging: LoggingSettings,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

/// History file settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// History file.
    pub path: PathBuf,
    /// Encoding; inferred from the extension when unset.
    pub format: Option<StorageFormat>,
    /// Repository URL written into the history.
    pub repo_url: Option<String>,
}

/// Persistence cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct FlushSettings {
    /// When appends are persisted.
    pub policy: FlushPolicy,
    /// Background flush cadence for the `interval` policy.
    pub interval_ms: u64,
    /// Upper bound on one snapshot write.
    pub timeout_ms: u64,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of text.
    pub json: bool,
}

impl Settings {
    /// Load defaults, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load defaults overlaid with a TOML document.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Listener address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Store configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            flush_policy: self.flush.policy,
            flush_interval: Duration::from_millis(self.flush.interval_ms),
            flush_timeout: Duration::from_millis(self.flush.timeout_ms),
            repo_url: self.storage.repo_url.clone(),
        }
    }

    /// File backend for the history.
    pub fn backend(&self) -> Arc<JsonFileBackend> {
        let format = self
            .storage
            .format
            .unwrap_or_else(|| StorageFormat::from_path(&self.storage.path));
        Arc::new(JsonFileBackend::new(&self.storage.path, format))
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("storage.path", "dev/bench/data.js")?
        .set_default("flush.policy", "interval")?
        .set_default("flush.interval_ms", 30_000)?
        .set_default("flush.timeout_ms", 10_000)?
        .set_default("ingest.keep_composite", true)?
        .set_default("logging.level", "info")?
        .set_default("logging.json", false)
}
