// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-series state and read snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use bench_history_core::CommitEntry;
use serde::Serialize;

/// Store-assigned position of an entry in its series' insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position(pub usize);

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mutable state of one series; guarded by the series lock.
///
/// `entries` is in insertion order and `index` maps commit id to its slot.
/// `view` is the date-ordered copy handed to readers; it is rebuilt on every
/// write so reads only clone an `Arc`.
#[derive(Debug)]
pub(crate) struct SeriesState {
    entries: Vec<CommitEntry>,
    index: HashMap<String, usize>,
    view: Arc<[CommitEntry]>,
}

impl Default for SeriesState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            view: Arc::from(Vec::new()),
        }
    }
}

impl SeriesState {
    /// Rebuild state from persisted entries. Later duplicates win.
    pub(crate) fn from_entries(entries: Vec<CommitEntry>) -> Self {
        let mut state = Self::default();
        for entry in entries {
            state.insert(entry);
        }
        state.rebuild_view();
        state
    }

    /// Insert or replace by commit id. Returns the position and whether an
    /// existing entry was replaced.
    pub(crate) fn upsert(&mut self, entry: CommitEntry) -> (Position, bool) {
        let result = self.insert(entry);
        self.rebuild_view();
        result
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn snapshot(&self, name: &str) -> SeriesSnapshot {
        SeriesSnapshot {
            name: name.to_string(),
            entries: Arc::clone(&self.view),
        }
    }

    fn insert(&mut self, entry: CommitEntry) -> (Position, bool) {
        match self.index.get(entry.id()) {
            Some(&slot) => {
                self.entries[slot] = entry;
                (Position(slot), true)
            }
            None => {
                let slot = self.entries.len();
                self.index.insert(entry.id().to_string(), slot);
                self.entries.push(entry);
                (Position(slot), false)
            }
        }
    }

    fn rebuild_view(&mut self) {
        let mut view = self.entries.clone();
        let in_order = view.windows(2).all(|pair| pair[0].date <= pair[1].date);
        if !in_order {
            // Stable: equal dates keep insertion order.
            view.sort_by_key(|entry| entry.date);
        }
        self.view = Arc::from(view);
    }
}

/// Point-in-time, date-ordered view of a series.
///
/// Later appends never show up in an existing snapshot. Iteration can be
/// restarted any number of times.
#[derive(Debug, Clone)]
pub struct SeriesSnapshot {
    name: String,
    entries: Arc<[CommitEntry]>,
}

impl SeriesSnapshot {
    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries ordered by run time ascending.
    pub fn entries(&self) -> &[CommitEntry] {
        &self.entries
    }

    /// Iterate entries in run-time order.
    pub fn iter(&self) -> std::slice::Iter<'_, CommitEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the series has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry for a commit id.
    pub fn find(&self, commit_id: &str) -> Option<&CommitEntry> {
        self.entries.iter().find(|entry| entry.id() == commit_id)
    }

    /// Copy the entries out.
    pub fn to_vec(&self) -> Vec<CommitEntry> {
        self.entries.to_vec()
    }
}

impl<'a> IntoIterator for &'a SeriesSnapshot {
    type Item = &'a CommitEntry;
    type IntoIter = std::slice::Iter<'a, CommitEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
