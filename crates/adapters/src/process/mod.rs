// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process adapters

mod child;
mod native;

pub use child::{ChildProcess, DRAIN_GRACE};
pub use native::TokioProcessAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProcessAdapter, ProcessCall};

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from process operations
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("process i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid arguments: {0:?}")]
    InvalidArguments(String),
}

/// Program, arguments and working directory of a child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append arguments from a shell-style string (quotes are honoured)
    pub fn arg_string(mut self, text: &str) -> Result<Self, ProcessError> {
        self.args.extend(split_arguments(text)?);
        Ok(self)
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Split a free-form argument string the way a POSIX shell would
pub fn split_arguments(text: &str) -> Result<Vec<String>, ProcessError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    shlex::split(text).ok_or_else(|| ProcessError::InvalidArguments(text.to_string()))
}

/// Captured result of a finished (or killed) child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Adapter for launching child processes
#[async_trait]
pub trait ProcessAdapter: Clone + Send + Sync + 'static {
    /// Run to completion, killing the process group once `timeout` elapses
    async fn run(&self, spec: &CommandSpec, timeout: Duration)
        -> Result<ProcessOutput, ProcessError>;

    /// Start a process and hand back its handle without waiting
    async fn spawn(&self, spec: &CommandSpec) -> Result<ChildProcess, ProcessError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
