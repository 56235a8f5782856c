// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution history records

use crate::id::TaskId;
use crate::task::{ScheduledTask, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum characters of output/error kept per history entry
pub const EXCERPT_LIMIT: usize = 1000;

/// One execution attempt of a scheduled task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskExecutionHistoryEntry {
    pub task_id: TaskId,
    /// Name at execution time, not kept in sync with later renames
    pub task_name: String,
    pub execution_time: DateTime<Utc>,
    pub status: TaskStatus,
    pub duration_ms: u64,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskExecutionHistoryEntry {
    pub fn new(
        task: &ScheduledTask,
        execution_time: DateTime<Utc>,
        status: TaskStatus,
        duration_ms: u64,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            execution_time,
            status,
            duration_ms,
            output: None,
            error: None,
        }
    }

    /// Attach captured output; empty text is stored as absent
    pub fn with_output(mut self, output: &str) -> Self {
        self.output = non_empty_excerpt(output);
        self
    }

    /// Attach captured error text; empty text is stored as absent
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = non_empty_excerpt(error);
        self
    }
}

/// First [`EXCERPT_LIMIT`] characters of `text`
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_LIMIT) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

fn non_empty_excerpt(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(excerpt(text))
    }
}
