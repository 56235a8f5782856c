// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Scheduled task and background job execution engine

mod error;
mod jobs;
mod scheduler;

pub use error::EngineError;
pub use jobs::JobRegistry;
pub use scheduler::{
    SchedulerConfig, SchedulerDeps, SchedulerStatus, TaskRun, TaskScheduler, TickReport,
    DEFAULT_TASK_TIMEOUT, DEFAULT_TICK_INTERVAL,
};
