// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Dashboard daemon: owns the scheduler loop and the background job registry

pub mod lifecycle;

pub use lifecycle::{
    default_root, startup, Config, DaemonJobs, DaemonNotifier, DaemonScheduler, DaemonState,
    LifecycleError, Settings, ROOT_ENV, SETTINGS_FILE,
};
