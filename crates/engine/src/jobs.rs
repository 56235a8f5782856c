// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background job registry
//!
//! Each running job has one monitor task that owns its child process. The
//! monitor is the only writer of a job's terminal state: it either sees the
//! process exit on its own, or receives a kill request from [`JobRegistry::stop`],
//! kills the process group, reaps the child and then acknowledges.
//!
//! ```text
//! stop()  --lock, take kill sender, unlock--> send(ack) --> await ack
//! monitor: select { exit, kill => kill_tree, commit Stopped, ack }
//!          then select { pipes closed (bounded by DRAIN_GRACE), kill => ... }
//!          commit Completed/Failed
//! ```
//!
//! A job that exits while a descendant keeps its output pipes open stays
//! `Running` for at most `DRAIN_GRACE`; the leftover group is then killed.

use crate::error::EngineError;
use dash_adapters::{
    ChildProcess, CommandSpec, Notification, NotifyAdapter, ProcessAdapter, DRAIN_GRACE,
};
use dash_core::{BackgroundJob, Clock, IdGen, JobExit, JobId, JobRequest, JobStatus};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Sent to a monitor to kill its process; the inner sender acknowledges the commit
type KillRequest = oneshot::Sender<()>;

struct JobEntry {
    job: BackgroundJob,
    kill: Option<oneshot::Sender<KillRequest>>,
}

struct Shared<P, N, C> {
    process: P,
    notify: N,
    clock: C,
    jobs: Mutex<Vec<JobEntry>>,
}

/// In-memory registry of ad-hoc background processes
pub struct JobRegistry<P, N, C, I> {
    shared: Arc<Shared<P, N, C>>,
    id_gen: I,
}

impl<P, N, C, I: Clone> Clone for JobRegistry<P, N, C, I> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            id_gen: self.id_gen.clone(),
        }
    }
}

fn job_title(name: &str) -> String {
    format!("Background Job: {name}")
}

impl<P, N, C, I> JobRegistry<P, N, C, I>
where
    P: ProcessAdapter,
    N: NotifyAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn new(process: P, notify: N, clock: C, id_gen: I) -> Self {
        Self {
            shared: Arc::new(Shared {
                process,
                notify,
                clock,
                jobs: Mutex::new(Vec::new()),
            }),
            id_gen,
        }
    }

    /// Launch a job and return its id.
    ///
    /// A launch failure still creates a job, already `Failed`, carrying the
    /// error message.
    pub async fn start(&self, request: JobRequest) -> JobId {
        let id = JobId::generate(&self.id_gen);
        let title = job_title(&request.name);

        let mut jobs = self.shared.jobs.lock().await;
        let spawned = match command_for(&request) {
            Ok(spec) => self.shared.process.spawn(&spec).await,
            Err(e) => Err(e),
        };

        match spawned {
            Ok(child) => {
                let (kill_tx, kill_rx) = oneshot::channel();
                let job = BackgroundJob::running(id.clone(), request, child.pid(), &self.shared.clock);
                tracing::info!(job_id = %id, name = %job.name, pid = ?job.pid, "job started");
                jobs.push(JobEntry {
                    job,
                    kill: Some(kill_tx),
                });
                drop(jobs);

                tokio::spawn(monitor(Arc::clone(&self.shared), id.clone(), child, kill_rx));
                self.shared
                    .send(Notification::info(title, "Job started"))
                    .await;
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(job_id = %id, error = %reason, "job failed to start");
                let job = BackgroundJob::failed_to_start(
                    id.clone(),
                    request,
                    reason.clone(),
                    &self.shared.clock,
                );
                jobs.push(JobEntry { job, kill: None });
                drop(jobs);

                self.shared
                    .send(Notification::error(title, format!("Failed to start: {reason}")))
                    .await;
            }
        }

        id
    }

    /// Kill a running job and wait until it is recorded as stopped.
    ///
    /// Returns false when the job had already finished.
    pub async fn stop(&self, id: &JobId) -> Result<bool, EngineError> {
        let kill = {
            let mut jobs = self.shared.jobs.lock().await;
            let entry = find_mut(&mut jobs, id)?;
            if !entry.job.is_running() {
                return Ok(false);
            }
            entry.kill.take()
        };

        // Another stop already owns the kill request
        let Some(kill) = kill else {
            return Ok(false);
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if kill.send(ack_tx).is_ok() {
            // An error here means the monitor committed a natural exit first
            let _ = ack_rx.await;
        }

        let jobs = self.shared.jobs.lock().await;
        Ok(find(&jobs, id)?.job.status == JobStatus::Stopped)
    }

    /// Stop the job if needed, then forget it
    pub async fn remove(&self, id: &JobId) -> Result<BackgroundJob, EngineError> {
        self.stop(id).await?;

        let mut jobs = self.shared.jobs.lock().await;
        let index = jobs
            .iter()
            .position(|e| &e.job.id == id)
            .ok_or_else(|| EngineError::JobNotFound(id.clone()))?;
        let entry = jobs.remove(index);
        tracing::info!(job_id = %id, status = %entry.job.status, "job removed");
        Ok(entry.job)
    }

    pub async fn get_job(&self, id: &JobId) -> Option<BackgroundJob> {
        let jobs = self.shared.jobs.lock().await;
        find(&jobs, id).ok().map(|e| e.job.clone())
    }

    /// All jobs in start order
    pub async fn get_all_jobs(&self) -> Vec<BackgroundJob> {
        let jobs = self.shared.jobs.lock().await;
        jobs.iter().map(|e| e.job.clone()).collect()
    }

    pub async fn running_jobs(&self) -> Vec<BackgroundJob> {
        let jobs = self.shared.jobs.lock().await;
        jobs.iter()
            .filter(|e| e.job.is_running())
            .map(|e| e.job.clone())
            .collect()
    }

    /// Stop every running job
    pub async fn shutdown(&self) {
        let running: Vec<JobId> = self
            .running_jobs()
            .await
            .into_iter()
            .map(|job| job.id)
            .collect();

        for id in running {
            if let Err(e) = self.stop(&id).await {
                tracing::warn!(job_id = %id, error = %e, "failed to stop job during shutdown");
            }
        }
    }
}

impl<P, N: NotifyAdapter, C: Clock> Shared<P, N, C> {
    async fn send(&self, notification: Notification) {
        if let Err(e) = self.notify.notify(&notification).await {
            tracing::warn!(error = %e, title = %notification.title, "notification failed");
        }
    }

    /// Apply a terminal transition and notify if it took effect
    async fn commit(&self, id: &JobId, status: JobStatus, exit: JobExit) {
        let committed = {
            let mut jobs = self.jobs.lock().await;
            match find_mut(&mut jobs, id) {
                Ok(entry) => {
                    let changed = if status == JobStatus::Stopped {
                        entry.job.stop(exit, &self.clock)
                    } else {
                        entry.job.complete(exit, &self.clock)
                    };
                    entry.kill = None;
                    changed.then(|| (entry.job.name.clone(), entry.job.status, entry.job.exit_code))
                }
                Err(_) => None,
            }
        };

        let Some((name, status, exit_code)) = committed else {
            return;
        };
        tracing::info!(job_id = %id, %status, ?exit_code, "job finished");

        let title = job_title(&name);
        let notification = match status {
            JobStatus::Completed => Notification::success(title, "Job completed successfully"),
            JobStatus::Stopped => Notification::warning(title, "Job stopped"),
            _ => Notification::error(title, "Job failed"),
        };
        self.send(notification).await;
    }
}

/// Own the child until it exits or a kill is requested
async fn monitor<P, N, C>(
    shared: Arc<Shared<P, N, C>>,
    id: JobId,
    mut child: ChildProcess,
    mut kill_rx: oneshot::Receiver<KillRequest>,
) where
    N: NotifyAdapter,
    C: Clock,
{
    // Prefer an exit that already happened over a concurrent kill request
    let exited = tokio::select! {
        biased;
        status = child.wait() => Ok(status),
        request = &mut kill_rx => Err(request.ok()),
    };
    let status = match exited {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            tracing::warn!(job_id = %id, error = %e, "wait failed");
            None
        }
        // A dropped sender means the registry went away; kill as well
        Err(ack) => return stop_job(&shared, &id, child, ack).await,
    };

    // Descendants may still hold the pipes; stay responsive to stop meanwhile
    let drained = tokio::select! {
        biased;
        closed = tokio::time::timeout(DRAIN_GRACE, child.closed()) => Ok(closed.is_ok()),
        request = &mut kill_rx => Err(request.ok()),
    };
    match drained {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(job_id = %id, "job exited but its process group kept output open, killing it");
            if let Err(e) = child.kill_tree().await {
                tracing::warn!(job_id = %id, error = %e, "kill failed");
            }
        }
        Err(ack) => return stop_job(&shared, &id, child, ack).await,
    }

    let output = child.into_output(status, false).await;
    shared.commit(&id, JobStatus::Completed, exit_of(output)).await;
}

/// Kill the process group, commit `Stopped`, then acknowledge the stop
async fn stop_job<P, N, C>(
    shared: &Shared<P, N, C>,
    id: &JobId,
    mut child: ChildProcess,
    ack: Option<KillRequest>,
) where
    N: NotifyAdapter,
    C: Clock,
{
    let status = match child.kill_tree().await {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::warn!(job_id = %id, error = %e, "kill failed");
            None
        }
    };
    let output = child.into_output(status, false).await;
    shared.commit(id, JobStatus::Stopped, exit_of(output)).await;
    if let Some(ack) = ack {
        let _ = ack.send(());
    }
}

fn exit_of(output: dash_adapters::ProcessOutput) -> JobExit {
    JobExit {
        exit_code: output.exit_code,
        output: output.stdout,
        error: output.stderr,
    }
}

fn command_for(request: &JobRequest) -> Result<CommandSpec, dash_adapters::ProcessError> {
    let spec = CommandSpec::new(&request.command).arg_string(&request.arguments)?;
    Ok(match &request.working_directory {
        Some(dir) => spec.in_dir(dir),
        None => spec,
    })
}

fn find<'a>(jobs: &'a [JobEntry], id: &JobId) -> Result<&'a JobEntry, EngineError> {
    jobs.iter()
        .find(|e| &e.job.id == id)
        .ok_or_else(|| EngineError::JobNotFound(id.clone()))
}

fn find_mut<'a>(jobs: &'a mut [JobEntry], id: &JobId) -> Result<&'a mut JobEntry, EngineError> {
    jobs.iter_mut()
        .find(|e| &e.job.id == id)
        .ok_or_else(|| EngineError::JobNotFound(id.clone()))
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
