// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled task model
//!
//! A scheduled task runs a named plugin or script whenever its cron
//! expression fires. There is no explicit state enum: the state is implied
//! by `enabled` and `next_execution_time`.
//!
//! ```text
//! Disabled --enable--> Scheduled --now >= next--> Due --tick--> Executing --> Scheduled
//! ```
//!
//! Next execution times are always computed from the current time, so
//! ticks missed while the scheduler was down are never replayed.

use crate::clock::Clock;
use crate::cron;
use crate::id::{IdGen, TaskId};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What kind of target a task runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Plugin,
    Script,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Plugin => write!(f, "Plugin"),
            TaskKind::Script => write!(f, "Script"),
        }
    }
}

/// Outcome of a single task execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Success,
    Failed,
    Timeout,
    Cancelled,
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Timeout => write!(f, "timeout"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A recurring task definition plus its execution bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: TaskId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// Plugin or script name handed to the target resolver
    pub target: String,
    pub cron_expression: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub notify_on_completion: bool,
    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub last_execution_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_execution_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_status: Option<TaskStatus>,
    #[serde(default)]
    pub execution_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub kind: TaskKind,
    pub target: String,
    pub cron_expression: String,
    pub enabled: bool,
    pub notify_on_completion: bool,
    pub notify_on_failure: bool,
    pub arguments: Option<String>,
    pub working_directory: Option<PathBuf>,
}

impl NewTask {
    pub fn new(
        name: impl Into<String>,
        kind: TaskKind,
        target: impl Into<String>,
        cron_expression: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            cron_expression: cron_expression.into(),
            enabled: true,
            notify_on_completion: false,
            notify_on_failure: true,
            arguments: None,
            working_directory: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn notify_on_completion(mut self, notify: bool) -> Self {
        self.notify_on_completion = notify;
        self
    }

    pub fn notify_on_failure(mut self, notify: bool) -> Self {
        self.notify_on_failure = notify;
        self
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }
}

/// Partial edit of a task; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub kind: Option<TaskKind>,
    pub target: Option<String>,
    pub cron_expression: Option<String>,
    pub notify_on_completion: Option<bool>,
    pub notify_on_failure: Option<bool>,
    pub arguments: Option<Option<String>>,
    pub working_directory: Option<Option<PathBuf>>,
}

impl TaskUpdate {
    pub fn cron_expression(mut self, expression: impl Into<String>) -> Self {
        self.cron_expression = Some(expression.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn arguments(mut self, arguments: Option<String>) -> Self {
        self.arguments = Some(arguments);
        self
    }
}

/// Next firing time for `expression`, evaluated in the host's local time zone
pub fn next_run_after(expression: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    cron::next_occurrence(expression, &now.with_timezone(&Local)).map(|t| t.with_timezone(&Utc))
}

impl ScheduledTask {
    /// Create a task from user input, assigning its id and first run time
    pub fn new(spec: NewTask, id_gen: &impl IdGen, clock: &impl Clock) -> Self {
        let now = clock.now();
        let mut task = Self {
            id: TaskId::generate(id_gen),
            name: spec.name,
            kind: spec.kind,
            target: spec.target,
            cron_expression: spec.cron_expression,
            enabled: spec.enabled,
            notify_on_completion: spec.notify_on_completion,
            notify_on_failure: spec.notify_on_failure,
            arguments: spec.arguments,
            working_directory: spec.working_directory,
            last_execution_time: None,
            next_execution_time: None,
            last_status: None,
            execution_count: 0,
            created_at: now,
        };
        task.reschedule(now);
        task
    }

    /// Recompute the next run time from `now`
    pub fn reschedule(&mut self, now: DateTime<Utc>) {
        self.next_execution_time = next_run_after(&self.cron_expression, now);
    }

    /// Recompute only when enabled and the stored time is missing or already past.
    ///
    /// Returns true if the next run time changed.
    pub fn refresh_if_stale(&mut self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.next_execution_time {
            Some(next) if next >= now => false,
            _ => {
                let before = self.next_execution_time;
                self.reschedule(now);
                before != self.next_execution_time
            }
        }
    }

    /// Enabled and scheduled at or before `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_execution_time.is_some_and(|next| next <= now)
    }

    /// Flip the enabled flag; re-enabling recomputes the next run time.
    ///
    /// Returns the new enabled state.
    pub fn toggle(&mut self, now: DateTime<Utc>) -> bool {
        self.enabled = !self.enabled;
        if self.enabled {
            self.reschedule(now);
        }
        self.enabled
    }

    /// Apply an edit and recompute the next run time
    pub fn apply(&mut self, update: TaskUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(target) = update.target {
            self.target = target;
        }
        if let Some(expression) = update.cron_expression {
            self.cron_expression = expression;
        }
        if let Some(notify) = update.notify_on_completion {
            self.notify_on_completion = notify;
        }
        if let Some(notify) = update.notify_on_failure {
            self.notify_on_failure = notify;
        }
        if let Some(arguments) = update.arguments {
            self.arguments = arguments;
        }
        if let Some(dir) = update.working_directory {
            self.working_directory = dir;
        }
        self.reschedule(now);
    }

    /// Record the outcome of one execution attempt.
    ///
    /// `finished_at` is the time the attempt ended; the next run is computed
    /// from it rather than from the missed schedule slot.
    pub fn record_execution(
        &mut self,
        started_at: DateTime<Utc>,
        status: TaskStatus,
        finished_at: DateTime<Utc>,
    ) {
        self.last_execution_time = Some(started_at);
        self.last_status = Some(status);
        self.execution_count += 1;
        self.reschedule(finished_at);
    }

    /// Whether the outcome should be surfaced through the notification sink
    pub fn wants_notification(&self, status: TaskStatus) -> bool {
        if status.is_success() {
            self.notify_on_completion
        } else {
            self.notify_on_failure
        }
    }

    /// Human label for the schedule
    pub fn schedule_label(&self) -> String {
        cron::describe(&self.cron_expression)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
