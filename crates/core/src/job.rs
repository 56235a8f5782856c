// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background job model
//!
//! A background job is a one-off process started on demand. It begins
//! `Running` (or `Failed` when the launch itself fails) and moves exactly once
//! to a terminal status. Terminal transitions on an already-terminal job are
//! ignored, so a late exit report can never resurrect or overwrite a job.

use crate::clock::Clock;
use crate::id::JobId;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle status of a background job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// What to launch for a background job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub name: String,
    pub command: String,
    pub arguments: String,
    pub working_directory: Option<PathBuf>,
}

impl JobRequest {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            arguments: arguments.into(),
            working_directory: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobExit {
    pub exit_code: Option<i32>,
    pub output: String,
    pub error: String,
}

/// An ad-hoc process tracked by the job registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundJob {
    pub id: JobId,
    pub name: String,
    pub command: String,
    pub arguments: String,
    pub working_directory: Option<PathBuf>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub output: Option<String>,
    pub error: Option<String>,
    /// OS process id while the process exists
    pub pid: Option<u32>,
}

impl BackgroundJob {
    /// A job whose process launched successfully
    pub fn running(id: JobId, request: JobRequest, pid: Option<u32>, clock: &impl Clock) -> Self {
        Self {
            id,
            name: request.name,
            command: request.command,
            arguments: request.arguments,
            working_directory: request.working_directory,
            start_time: clock.now(),
            end_time: None,
            status: JobStatus::Running,
            exit_code: None,
            output: None,
            error: None,
            pid,
        }
    }

    /// A job whose process could not be started
    pub fn failed_to_start(
        id: JobId,
        request: JobRequest,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.now();
        Self {
            id,
            name: request.name,
            command: request.command,
            arguments: request.arguments,
            working_directory: request.working_directory,
            start_time: now,
            end_time: Some(now),
            status: JobStatus::Failed,
            exit_code: None,
            output: None,
            error: Some(reason.into()),
            pid: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// The process exited on its own: `Completed` on exit code 0, `Failed` otherwise.
    ///
    /// Returns false (and changes nothing) if the job already left `Running`.
    pub fn complete(&mut self, exit: JobExit, clock: &impl Clock) -> bool {
        let status = if exit.exit_code == Some(0) {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        self.finish(status, exit, clock)
    }

    /// The process was killed on request
    pub fn stop(&mut self, exit: JobExit, clock: &impl Clock) -> bool {
        self.finish(JobStatus::Stopped, exit, clock)
    }

    fn finish(&mut self, status: JobStatus, exit: JobExit, clock: &impl Clock) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.end_time = Some(clock.now());
        self.exit_code = exit.exit_code;
        self.output = Some(exit.output);
        self.error = Some(exit.error);
        self.pid = None;
        true
    }

    /// Elapsed run time; measured up to `now` while still running
    pub fn duration(&self, now: DateTime<Utc>) -> TimeDelta {
        self.end_time.unwrap_or(now) - self.start_time
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
