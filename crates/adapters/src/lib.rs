// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: child processes, target lookup, notifications

pub mod notify;
pub mod process;
pub mod resolve;
pub mod traced;

pub use notify::{DesktopNotifier, NoOpNotifyAdapter, Notification, NotifyAdapter, NotifyError, Severity};
pub use process::{
    ChildProcess, CommandSpec, ProcessAdapter, ProcessError, ProcessOutput, TokioProcessAdapter,
    DRAIN_GRACE,
};
pub use resolve::{DirectoryResolver, ResolveError, ResolvedTarget, TargetResolver};
pub use traced::{TracedNotifyAdapter, TracedProcessAdapter, TracedResolver};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use process::{FakeProcessAdapter, ProcessCall};
#[cfg(any(test, feature = "test-support"))]
pub use resolve::FakeResolver;
