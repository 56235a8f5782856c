// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake process adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    ChildProcess, CommandSpec, ProcessAdapter, ProcessError, ProcessOutput, TokioProcessAdapter,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded process launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCall {
    pub spec: CommandSpec,
    /// `None` for `spawn`
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(ProcessOutput),
    LaunchError(String),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<ProcessCall>,
    scripted: HashMap<String, Scripted>,
}

/// Fake process adapter for testing.
///
/// `run` answers from scripted results keyed by program (exit 0 with empty
/// output otherwise). `spawn` launches a real process so job tests can
/// observe genuine exits and kills.
#[derive(Clone, Default)]
pub struct FakeProcessAdapter {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcessAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result `run` returns for `program`
    pub fn set_output(&self, program: &str, output: ProcessOutput) {
        self.lock()
            .scripted
            .insert(program.to_string(), Scripted::Output(output));
    }

    /// Make launches of `program` fail as if it did not exist
    pub fn set_launch_error(&self, program: &str, message: &str) {
        self.lock()
            .scripted
            .insert(program.to_string(), Scripted::LaunchError(message.to_string()));
    }

    /// Get all recorded launches
    pub fn calls(&self) -> Vec<ProcessCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, spec: &CommandSpec, timeout: Option<Duration>) -> Option<Scripted> {
        let mut state = self.lock();
        state.calls.push(ProcessCall {
            spec: spec.clone(),
            timeout,
        });
        state.scripted.get(&spec.program).cloned()
    }
}

fn launch_error(spec: &CommandSpec, message: String) -> ProcessError {
    ProcessError::Spawn {
        program: spec.program.clone(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, message),
    }
}

#[async_trait]
impl ProcessAdapter for FakeProcessAdapter {
    async fn run(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        match self.record(spec, Some(timeout)) {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::LaunchError(message)) => Err(launch_error(spec, message)),
            None => Ok(ProcessOutput::exited(0, "", "")),
        }
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<ChildProcess, ProcessError> {
        if let Some(Scripted::LaunchError(message)) = self.record(spec, None) {
            return Err(launch_error(spec, message));
        }
        TokioProcessAdapter::new().spawn(spec).await
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
