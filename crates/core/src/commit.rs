// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Commit entries: one CI run attributed to a commit.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::record::BenchmarkRecord;

/// Shortest accepted abbreviated commit hash.
pub const MIN_COMMIT_ID_LEN: usize = 4;

/// Longest accepted commit hash (SHA-256 object ids).
pub const MAX_COMMIT_ID_LEN: usize = 64;

/// Whether `id` looks like a (possibly abbreviated) content hash.
pub fn is_content_hash(id: &str) -> bool {
    (MIN_COMMIT_ID_LEN..=MAX_COMMIT_ID_LEN).contains(&id.len())
        && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Author or committer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display name.
    pub name: String,
    /// E-mail address.
    pub email: String,
    /// Forge handle, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Identity {
    /// Create a new identity.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            username: None,
        }
    }

    /// Set the forge handle.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    fn unknown() -> Self {
        Self::new("unknown", "unknown@localhost")
    }
}

/// Commit metadata for a CI run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Content hash of the commit.
    pub id: String,
    /// Commit timestamp as recorded by the VCS.
    pub timestamp: DateTime<FixedOffset>,
    /// Commit author.
    pub author: Identity,
    /// Commit committer.
    pub committer: Identity,
    /// Whether this commit was the branch head when the run was recorded.
    #[serde(default)]
    pub distinct: bool,
    /// Commit message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Tree object id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    /// Web URL of the commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One CI run's full benchmark output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitEntry {
    /// Commit the run is attributed to.
    pub commit: CommitInfo,
    /// Run time in epoch milliseconds; orders entries within a series.
    pub date: i64,
    /// Name of the benchmark harness, e.g. `go`.
    pub tool: String,
    /// Records produced by the run, in harness order.
    pub benches: Vec<BenchmarkRecord>,
}

impl CommitEntry {
    /// Create a new builder.
    pub fn builder() -> CommitEntryBuilder {
        CommitEntryBuilder::default()
    }

    /// Commit id shortcut.
    pub fn id(&self) -> &str {
        &self.commit.id
    }

    /// Find a record by name.
    pub fn bench(&self, name: &str) -> Option<&BenchmarkRecord> {
        self.benches.iter().find(|record| record.name == name)
    }

    /// Run time as a UTC datetime, if `date` is representable.
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.date).single()
    }
}

/// Builder for [`CommitEntry`] instances.
#[derive(Default)]
pub struct CommitEntryBuilder {
    id: Option<String>,
    timestamp: Option<DateTime<FixedOffset>>,
    author: Option<Identity>,
    committer: Option<Identity>,
    distinct: bool,
    message: Option<String>,
    url: Option<String>,
    date: Option<i64>,
    tool: Option<String>,
    benches: Vec<BenchmarkRecord>,
}

impl CommitEntryBuilder {
    /// Set the commit id (required).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the commit timestamp. Defaults to the run time.
    pub fn timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the author. The committer defaults to the author.
    pub fn author(mut self, author: Identity) -> Self {
        self.author = Some(author);
        self
    }

    /// Set the committer.
    pub fn committer(mut self, committer: Identity) -> Self {
        self.committer = Some(committer);
        self
    }

    /// Mark the commit as the branch head at record time.
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Set the commit message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the commit URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the run time in epoch milliseconds. Defaults to now.
    pub fn date(mut self, date: i64) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the harness name. Defaults to `custom`.
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Add a record.
    pub fn bench(mut self, record: BenchmarkRecord) -> Self {
        self.benches.push(record);
        self
    }

    /// Build the [`CommitEntry`]. Returns `Err` if the commit id is missing
    /// or the run time is not representable.
    pub fn build(self) -> Result<CommitEntry, ValidationError> {
        let id = self
            .id
            .ok_or_else(|| ValidationError::new("commit.id", "commit id is required"))?;
        let date = self.date.unwrap_or_else(|| Utc::now().timestamp_millis());
        let timestamp = match self.timestamp {
            Some(timestamp) => timestamp,
            None => Utc
                .timestamp_millis_opt(date)
                .single()
                .ok_or_else(|| ValidationError::new("date", "not a valid epoch-millis value"))?
                .fixed_offset(),
        };
        let author = self.author.unwrap_or_else(Identity::unknown);
        let committer = self.committer.unwrap_or_else(|| author.clone());

        Ok(CommitEntry {
            commit: CommitInfo {
                id,
                timestamp,
                author,
                committer,
                distinct: self.distinct,
                message: self.message,
                tree_id: None,
                url: self.url,
            },
            date,
            tool: self.tool.unwrap_or_else(|| "custom".to_string()),
            benches: self.benches,
        })
    }
}
