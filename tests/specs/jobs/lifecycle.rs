// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background job specs
//!
//! Verify job start, completion and stop against real processes.

use crate::prelude::*;

#[tokio::test]
async fn job_runs_script_to_completion() {
    let world = World::new();
    let script = world.script("export", "echo exported\n");
    let jobs = world.jobs();

    let id = jobs
        .start(JobRequest::new("Export", "sh", script.display().to_string()))
        .await;
    let job = wait_for_job(&jobs, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output.as_deref().map(str::trim), Some("exported"));
    assert_eq!(
        world.notify.titles(),
        ["Background Job: Export", "Background Job: Export"]
    );
}

#[tokio::test]
async fn stopped_job_is_recorded_as_stopped() {
    let world = World::new();
    let jobs = world.jobs();
    let id = jobs
        .start(JobRequest::new("Watcher", "sh", "-c 'sleep 30'"))
        .await;

    assert!(jobs.stop(&id).await.unwrap());

    let job = jobs.get_job(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Stopped);
    assert!(job.pid.is_none());
    assert!(jobs.running_jobs().await.is_empty());
}

#[tokio::test]
async fn unknown_program_fails_to_start() {
    let world = World::new();
    let jobs = world.jobs();

    let id = jobs
        .start(JobRequest::new("Nope", "definitely-not-a-program-dash", ""))
        .await;

    let job = jobs.get_job(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.is_some());
    let calls = world.notify.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].severity, Severity::Error);
    assert!(calls[0].message.starts_with("Failed to start: "));
}
