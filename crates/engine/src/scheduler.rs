// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-driven task scheduler
//!
//! The scheduler owns the task list behind a single async mutex. A tick
//! holds that lock from selecting due tasks until the last of them has run,
//! so edits made while a tick is in flight wait for it to finish.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use dash_adapters::{Notification, NotifyAdapter, ProcessAdapter, TargetResolver};
use dash_core::{
    next_run_after, Clock, CronExpr, IdGen, NewTask, ScheduledTask, TaskExecutionHistoryEntry,
    TaskId, TaskStatus, TaskUpdate,
};
use dash_storage::{HistoryLog, LogWrite, TaskStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// A scheduled run is killed once it exceeds this
    pub task_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            task_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }
}

/// Scheduler adapter and storage dependencies
pub struct SchedulerDeps<R, P, N> {
    pub resolver: R,
    pub process: P,
    pub notify: N,
    pub store: TaskStore,
    pub history: HistoryLog,
}

/// Snapshot for status displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub running: bool,
    pub total_tasks: usize,
    pub enabled_tasks: usize,
    /// Earliest next execution among enabled tasks
    pub next_due: Option<(TaskId, DateTime<Utc>)>,
}

/// One executed task within a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub history: LogWrite,
}

/// What a tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub runs: Vec<TaskRun>,
}

impl TickReport {
    pub fn executed(&self) -> Vec<TaskId> {
        self.runs.iter().map(|r| r.task_id.clone()).collect()
    }
}

/// Result of running one task's process
struct Outcome {
    status: TaskStatus,
    output: String,
    error: String,
}

impl Outcome {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            output: String::new(),
            error: error.into(),
        }
    }
}

pub struct TaskScheduler<R, P, N, C: Clock, I: IdGen> {
    resolver: R,
    process: P,
    notify: N,
    store: TaskStore,
    history: HistoryLog,
    clock: C,
    id_gen: I,
    config: SchedulerConfig,
    tasks: Mutex<Vec<ScheduledTask>>,
    running: AtomicBool,
}

impl<R, P, N, C, I> TaskScheduler<R, P, N, C, I>
where
    R: TargetResolver,
    P: ProcessAdapter,
    N: NotifyAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn new(deps: SchedulerDeps<R, P, N>, clock: C, id_gen: I, config: SchedulerConfig) -> Self {
        Self {
            resolver: deps.resolver,
            process: deps.process,
            notify: deps.notify,
            store: deps.store,
            history: deps.history,
            clock,
            id_gen,
            config,
            tasks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Load persisted tasks, refresh stale next-run times and begin accepting ticks.
    ///
    /// Tasks whose time passed while the scheduler was down are rescheduled,
    /// not run.
    pub async fn start(&self) -> Result<(), EngineError> {
        let mut tasks = self.tasks.lock().await;
        *tasks = self.store.load()?;

        let now = self.clock.now();
        let refreshed = tasks
            .iter_mut()
            .map(|task| task.refresh_if_stale(now))
            .filter(|changed| *changed)
            .count();
        self.store.save(&tasks)?;

        self.running.store(true, Ordering::SeqCst);
        tracing::info!(tasks = tasks.len(), refreshed, "scheduler started");
        Ok(())
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let tasks = self.tasks.lock().await;
        let next_due = tasks
            .iter()
            .filter(|t| t.enabled)
            .filter_map(|t| t.next_execution_time.map(|next| (t.id.clone(), next)))
            .min_by_key(|(_, next)| *next);

        SchedulerStatus {
            running: self.is_running(),
            total_tasks: tasks.len(),
            enabled_tasks: tasks.iter().filter(|t| t.enabled).count(),
            next_due,
        }
    }

    /// Run every due task, in list order, one after another.
    ///
    /// Does nothing while the scheduler is stopped.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_running() {
            return report;
        }

        let mut tasks = self.tasks.lock().await;
        let now = self.clock.now();
        let due: Vec<usize> = (0..tasks.len()).filter(|&i| tasks[i].is_due(now)).collect();
        if due.is_empty() {
            return report;
        }
        tracing::debug!(due = due.len(), "tick");

        for index in due {
            let run = self.execute_at(&mut tasks, index).await;
            report.runs.push(run);
        }
        report
    }

    /// Execute a task immediately, outside its schedule
    pub async fn run_now(&self, id: &TaskId) -> Result<TaskRun, EngineError> {
        let mut tasks = self.tasks.lock().await;
        let index = position(&tasks, id)?;
        Ok(self.execute_at(&mut tasks, index).await)
    }

    /// Execute `tasks[index]`, then persist, log history and notify
    async fn execute_at(&self, tasks: &mut [ScheduledTask], index: usize) -> TaskRun {
        let span = tracing::info_span!(
            "task.execute",
            task_id = %tasks[index].id,
            name = %tasks[index].name
        );
        self.execute(tasks, index).instrument(span).await
    }

    async fn execute(&self, tasks: &mut [ScheduledTask], index: usize) -> TaskRun {
        let started_at = self.clock.now();
        let timer = Instant::now();
        let outcome = self.run_target(&tasks[index]).await;
        let duration_ms = timer.elapsed().as_millis() as u64;

        let task = &mut tasks[index];
        task.record_execution(started_at, outcome.status, self.clock.now());
        let task = task.clone();

        tracing::info!(
            status = %outcome.status,
            duration_ms,
            next = ?task.next_execution_time,
            "task executed"
        );

        if let Err(e) = self.store.save(tasks) {
            tracing::error!(error = %e, "failed to persist tasks after execution");
        }

        let entry = TaskExecutionHistoryEntry::new(&task, started_at, outcome.status, duration_ms)
            .with_output(&outcome.output)
            .with_error(&outcome.error);
        let history = self.history.append_best_effort(entry);

        if task.wants_notification(outcome.status) {
            self.send(task_notification(&task.name, &outcome)).await;
        }

        TaskRun {
            task_id: task.id,
            status: outcome.status,
            history,
        }
    }

    /// Resolve and run a task's target; every failure becomes an outcome
    async fn run_target(&self, task: &ScheduledTask) -> Outcome {
        let target = match self.resolver.resolve(task.kind, &task.target).await {
            Ok(Some(target)) => target,
            Ok(None) => return Outcome::failed(format!("{} '{}' not found", task.kind, task.target)),
            Err(e) => return Outcome::failed(e.to_string()),
        };

        let spec = match target.command(
            task.arguments.as_deref(),
            task.working_directory.as_deref(),
        ) {
            Ok(spec) => spec,
            Err(e) => return Outcome::failed(e.to_string()),
        };

        match self.process.run(&spec, self.config.task_timeout).await {
            Ok(output) if output.timed_out => {
                let error = if output.stderr.is_empty() {
                    format!("timed out after {}s", self.config.task_timeout.as_secs())
                } else {
                    output.stderr
                };
                Outcome {
                    status: TaskStatus::Timeout,
                    output: output.stdout,
                    error,
                }
            }
            Ok(output) => Outcome {
                status: if output.success() {
                    TaskStatus::Success
                } else {
                    TaskStatus::Failed
                },
                output: output.stdout,
                error: output.stderr,
            },
            Err(e) => Outcome::failed(e.to_string()),
        }
    }

    async fn send(&self, notification: Notification) {
        if let Err(e) = self.notify.notify(&notification).await {
            tracing::warn!(error = %e, title = %notification.title, "notification failed");
        }
    }

    pub async fn add_task(&self, spec: NewTask) -> Result<ScheduledTask, EngineError> {
        validate_cron(&spec.cron_expression, self.clock.now())?;

        let mut tasks = self.tasks.lock().await;
        let task = ScheduledTask::new(spec, &self.id_gen, &self.clock);
        tasks.push(task.clone());
        self.store.save(&tasks)?;

        tracing::info!(task_id = %task.id, name = %task.name, "task added");
        Ok(task)
    }

    pub async fn update_task(
        &self,
        id: &TaskId,
        update: TaskUpdate,
    ) -> Result<ScheduledTask, EngineError> {
        let now = self.clock.now();
        if let Some(expression) = &update.cron_expression {
            validate_cron(expression, now)?;
        }

        let mut tasks = self.tasks.lock().await;
        let index = position(&tasks, id)?;
        tasks[index].apply(update, now);
        let task = tasks[index].clone();
        self.store.save(&tasks)?;

        tracing::info!(task_id = %id, "task updated");
        Ok(task)
    }

    pub async fn delete_task(&self, id: &TaskId) -> Result<ScheduledTask, EngineError> {
        let mut tasks = self.tasks.lock().await;
        let index = position(&tasks, id)?;
        let task = tasks.remove(index);
        self.store.save(&tasks)?;

        tracing::info!(task_id = %id, "task deleted");
        Ok(task)
    }

    /// Flip a task's enabled flag; returns the new state
    pub async fn toggle_task(&self, id: &TaskId) -> Result<bool, EngineError> {
        let mut tasks = self.tasks.lock().await;
        let index = position(&tasks, id)?;
        let enabled = tasks[index].toggle(self.clock.now());
        self.store.save(&tasks)?;

        tracing::info!(task_id = %id, enabled, "task toggled");
        Ok(enabled)
    }

    pub async fn get_task(&self, id: &TaskId) -> Option<ScheduledTask> {
        let tasks = self.tasks.lock().await;
        tasks.iter().find(|t| &t.id == id).cloned()
    }

    pub async fn get_all_tasks(&self) -> Vec<ScheduledTask> {
        self.tasks.lock().await.clone()
    }

    /// Most recent history entries, optionally for one task
    pub fn history(&self, task_id: Option<&TaskId>, limit: usize) -> Vec<TaskExecutionHistoryEntry> {
        self.history.read(task_id, limit)
    }

    /// Tick every `interval` until `shutdown` is cancelled
    pub async fn run(&self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    if !report.runs.is_empty() {
                        tracing::info!(executed = report.runs.len(), "tick complete");
                    }
                }
            }
        }
        tracing::info!("scheduler loop exited");
    }
}

fn position(tasks: &[ScheduledTask], id: &TaskId) -> Result<usize, EngineError> {
    tasks
        .iter()
        .position(|t| &t.id == id)
        .ok_or_else(|| EngineError::TaskNotFound(id.clone()))
}

/// Reject expressions that fail to parse or never fire within the search window
fn validate_cron(expression: &str, now: DateTime<Utc>) -> Result<(), EngineError> {
    CronExpr::parse(expression).map_err(|e| EngineError::invalid_cron(expression, e))?;
    if next_run_after(expression, now).is_none() {
        return Err(EngineError::InvalidCron {
            expression: expression.to_string(),
            reason: "never fires within a year".to_string(),
        });
    }
    Ok(())
}

fn task_notification(name: &str, outcome: &Outcome) -> Notification {
    if outcome.status.is_success() {
        Notification::success("Task Completed", format!("'{name}' executed successfully"))
    } else {
        let error = if outcome.error.trim().is_empty() {
            "Unknown error"
        } else {
            outcome.error.trim()
        };
        Notification::error("Task Failed", format!("'{name}' failed: {error}"))
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
