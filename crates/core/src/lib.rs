// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dash-core: data model for the dashboard task scheduler
//!
//! This crate provides:
//! - A five-field cron evaluator with next-occurrence search
//! - Scheduled task, execution history and background job records
//! - Clock and id generation seams for deterministic tests

pub mod clock;
pub mod cron;
pub mod history;
pub mod id;
pub mod job;
pub mod task;

pub use clock::{Clock, FakeClock, SystemClock};
pub use cron::{describe, next_occurrence, CronError, CronExpr};
pub use history::TaskExecutionHistoryEntry;
pub use id::{IdGen, JobId, SequentialIdGen, TaskId, UuidIdGen};
pub use job::{BackgroundJob, JobExit, JobRequest, JobStatus};
pub use task::{next_run_after, NewTask, ScheduledTask, TaskKind, TaskStatus, TaskUpdate};
