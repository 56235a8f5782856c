// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokio-backed process adapter

use super::{ChildProcess, CommandSpec, ProcessAdapter, ProcessError, ProcessOutput};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Launches real OS processes in their own process group
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioProcessAdapter;

impl TokioProcessAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessAdapter for TokioProcessAdapter {
    async fn run(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let mut child = self.spawn(spec).await?;

        // One deadline covers the exit and the pipes closing; a backgrounded
        // descendant can hold the pipes open after the child itself exits
        let finished = tokio::time::timeout(timeout, async {
            let status = child.wait().await?;
            child.closed().await;
            Ok::<_, ProcessError>(status)
        })
        .await;

        match finished {
            Ok(status) => {
                let status = status?;
                Ok(child.into_output(Some(status), false).await)
            }
            Err(_) => {
                tracing::warn!(
                    program = %spec.program,
                    timeout_secs = timeout.as_secs(),
                    "timed out, killing process group"
                );
                let status = child.kill_tree().await.ok();
                Ok(child.into_output(status, true).await)
            }
        }
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<ChildProcess, ProcessError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        Ok(ChildProcess::from_child(child))
    }
}

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;
