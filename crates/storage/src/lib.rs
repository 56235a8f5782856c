// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! JSON-file storage for scheduled tasks and execution history

mod history;
mod json;
mod tasks;

pub use history::{HistoryError, HistoryLog, LogWrite, DEFAULT_HISTORY_LIMIT, HISTORY_FILE};
pub use json::StorageError;
pub use tasks::{TaskStore, TASKS_FILE};
