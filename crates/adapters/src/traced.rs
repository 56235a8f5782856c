// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::notify::{Notification, NotifyAdapter, NotifyError};
use crate::process::{ChildProcess, CommandSpec, ProcessAdapter, ProcessError, ProcessOutput};
use crate::resolve::{ResolveError, ResolvedTarget, TargetResolver};
use async_trait::async_trait;
use dash_core::TaskKind;
use std::time::Duration;

fn check_cwd(spec: &CommandSpec) -> Result<(), ProcessError> {
    match &spec.cwd {
        Some(cwd) if !cwd.is_dir() => {
            tracing::error!(cwd = %cwd.display(), "working directory does not exist");
            Err(ProcessError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("working directory does not exist: {}", cwd.display()),
                ),
            })
        }
        _ => Ok(()),
    }
}

/// Wrapper that adds tracing to any ProcessAdapter
#[derive(Clone)]
pub struct TracedProcessAdapter<P> {
    inner: P,
}

impl<P> TracedProcessAdapter<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: ProcessAdapter> ProcessAdapter for TracedProcessAdapter<P> {
    async fn run(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let span = tracing::info_span!("process.run", program = %spec.program);
        let _guard = span.enter();

        tracing::info!(
            args = ?spec.args,
            timeout_secs = timeout.as_secs(),
            "starting"
        );
        check_cwd(spec)?;

        let start = std::time::Instant::now();
        let result = self.inner.run(spec, timeout).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(output) => tracing::info!(
                exit_code = ?output.exit_code,
                timed_out = output.timed_out,
                elapsed_ms = elapsed.as_millis() as u64,
                "process finished"
            ),
            Err(e) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "run failed"
            ),
        }

        result
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<ChildProcess, ProcessError> {
        let span = tracing::info_span!("process.spawn", program = %spec.program);
        let _guard = span.enter();

        tracing::info!(args = ?spec.args, "starting");
        check_cwd(spec)?;

        let result = self.inner.spawn(spec).await;
        match &result {
            Ok(child) => tracing::info!(pid = ?child.pid(), "process spawned"),
            Err(e) => tracing::error!(error = %e, "spawn failed"),
        }

        result
    }
}

/// Wrapper that adds tracing to any NotifyAdapter
#[derive(Clone)]
pub struct TracedNotifyAdapter<N> {
    inner: N,
}

impl<N> TracedNotifyAdapter<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<N: NotifyAdapter> NotifyAdapter for TracedNotifyAdapter<N> {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let span = tracing::info_span!(
            "notify",
            title = %notification.title,
            severity = %notification.severity
        );
        let _guard = span.enter();

        let result = self.inner.notify(notification).await;
        // Notification failures never affect the caller's outcome
        match &result {
            Ok(()) => tracing::debug!(message = %notification.message, "sent"),
            Err(e) => tracing::warn!(error = %e, "notification failed"),
        }

        result
    }
}

/// Wrapper that adds tracing to any TargetResolver
#[derive(Clone)]
pub struct TracedResolver<R> {
    inner: R,
}

impl<R> TracedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: TargetResolver> TargetResolver for TracedResolver<R> {
    async fn resolve(
        &self,
        kind: TaskKind,
        name: &str,
    ) -> Result<Option<ResolvedTarget>, ResolveError> {
        let result = self.inner.resolve(kind, name).await;
        match &result {
            Ok(Some(target)) => {
                tracing::debug!(%kind, name, program = %target.program, "resolved")
            }
            Ok(None) => tracing::info!(%kind, name, "target not found"),
            Err(e) => tracing::warn!(%kind, name, error = %e, "resolve failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
