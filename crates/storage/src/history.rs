// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capped execution history log
//!
//! Entries live in one JSON array, most recent first, trimmed to the newest
//! `limit` entries on every append. The scheduler logs through
//! [`HistoryLog::append_best_effort`]: a history failure is reported back
//! as a [`LogWrite`] value and never fails the execution it describes.

use crate::json::{read_list, write_atomic, StorageError};
use dash_core::{TaskExecutionHistoryEntry, TaskId};
use std::path::{Path, PathBuf};

pub const HISTORY_FILE: &str = "task-history.json";
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

pub type HistoryError = StorageError;

/// Outcome of a best-effort history write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogWrite {
    Written,
    Failed(String),
}

impl LogWrite {
    pub fn is_written(&self) -> bool {
        matches!(self, LogWrite::Written)
    }
}

#[derive(Clone, Debug)]
pub struct HistoryLog {
    path: PathBuf,
    limit: usize,
}

impl HistoryLog {
    /// Log under `<root>/logs/task-history.json`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::at(root.as_ref().join("logs").join(HISTORY_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` entries (at least one)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Add an entry, keeping only the newest `limit` by execution time
    pub fn append(&self, entry: TaskExecutionHistoryEntry) -> Result<(), HistoryError> {
        let mut entries: Vec<TaskExecutionHistoryEntry> = read_list(&self.path)?;
        entries.push(entry);
        // Stable sort keeps insertion order among equal timestamps
        entries.sort_by(|a, b| b.execution_time.cmp(&a.execution_time));
        entries.truncate(self.limit);
        write_atomic(&self.path, &entries)
    }

    /// Append, logging instead of propagating any failure
    pub fn append_best_effort(&self, entry: TaskExecutionHistoryEntry) -> LogWrite {
        let task_id = entry.task_id.clone();
        match self.append(entry) {
            Ok(()) => LogWrite::Written,
            Err(e) => {
                tracing::warn!(
                    task_id = %task_id,
                    path = %self.path.display(),
                    error = %e,
                    "failed to write execution history"
                );
                LogWrite::Failed(e.to_string())
            }
        }
    }

    /// Most recent entries first, optionally for one task only.
    ///
    /// An unreadable or corrupt log reads as empty.
    pub fn read(&self, task_id: Option<&TaskId>, limit: usize) -> Vec<TaskExecutionHistoryEntry> {
        let entries: Vec<TaskExecutionHistoryEntry> = match read_list(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unreadable history log");
                return Vec::new();
            }
        };

        let mut entries: Vec<_> = entries
            .into_iter()
            .filter(|entry| match task_id {
                Some(id) => &entry.task_id == id,
                None => true,
            })
            .collect();
        entries.sort_by(|a, b| b.execution_time.cmp(&a.execution_time));
        entries.truncate(limit);
        entries
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
