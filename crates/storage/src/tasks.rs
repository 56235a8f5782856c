// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent scheduled task list

use crate::json::{read_list, write_atomic, StorageError};
use dash_core::ScheduledTask;
use std::path::{Path, PathBuf};

pub const TASKS_FILE: &str = "scheduled-tasks.json";

/// The full ordered task list, stored as one JSON document
#[derive(Clone, Debug)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Store under `<root>/scheduled-tasks.json`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::at(root.as_ref().join(TASKS_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all tasks; an absent file means no tasks yet
    pub fn load(&self) -> Result<Vec<ScheduledTask>, StorageError> {
        let tasks: Vec<ScheduledTask> = read_list(&self.path)?;
        tracing::debug!(count = tasks.len(), path = %self.path.display(), "loaded tasks");
        Ok(tasks)
    }

    /// Replace the stored list with `tasks`
    pub fn save(&self, tasks: &[ScheduledTask]) -> Result<(), StorageError> {
        write_atomic(&self.path, &tasks)
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
