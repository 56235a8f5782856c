// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler and job registry

use dash_core::{CronError, JobId, TaskId};
use dash_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron { expression: String, reason: String },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    pub(crate) fn invalid_cron(expression: &str, err: CronError) -> Self {
        Self::InvalidCron {
            expression: expression.to_string(),
            reason: err.to_string(),
        }
    }
}
