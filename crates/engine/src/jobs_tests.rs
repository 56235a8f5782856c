// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dash_adapters::{FakeNotifyAdapter, FakeProcessAdapter, Severity};
use dash_core::{FakeClock, SequentialIdGen};
use std::time::{Duration, Instant};

type TestRegistry = JobRegistry<FakeProcessAdapter, FakeNotifyAdapter, FakeClock, SequentialIdGen>;

struct Harness {
    process: FakeProcessAdapter,
    notify: FakeNotifyAdapter,
    registry: TestRegistry,
}

fn harness() -> Harness {
    let process = FakeProcessAdapter::new();
    let notify = FakeNotifyAdapter::new();
    let registry = JobRegistry::new(
        process.clone(),
        notify.clone(),
        FakeClock::new(),
        SequentialIdGen::new("job"),
    );
    Harness {
        process,
        notify,
        registry,
    }
}

fn sh(name: &str, script: &str) -> JobRequest {
    JobRequest::new(name, "sh", format!("-c '{script}'"))
}

/// The process is gone, or only a zombie awaiting its new parent's reap
fn gone(pid: i32) -> bool {
    use nix::errno::Errno;
    match nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None) {
        Err(Errno::ESRCH) => true,
        _ => std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .map(|stat| stat.rsplit(')').next().unwrap_or("").trim_start().starts_with('Z'))
            .unwrap_or(false),
    }
}

async fn assert_gone(pid: i32) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !gone(pid) {
        assert!(Instant::now() < deadline, "process {pid} still alive");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Poll until the job leaves `Running`
async fn finished(registry: &TestRegistry, id: &JobId) -> BackgroundJob {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let job = registry.get_job(id).await.unwrap();
        if !job.is_running() {
            return job;
        }
        assert!(Instant::now() < deadline, "job {id} never finished");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn zero_exit_completes_with_output() {
    let h = harness();
    let id = h.registry.start(sh("greeter", "echo ok")).await;

    let job = finished(&h.registry, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.exit_code, Some(0));
    assert_eq!(job.output.as_deref().map(str::trim), Some("ok"));
    assert!(job.end_time.is_some());
    assert!(job.pid.is_none());

    let calls = h.notify.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|n| n.title == "Background Job: greeter"));
    assert_eq!(calls[0].message, "Job started");
    assert_eq!(calls[0].severity, Severity::Info);
    assert_eq!(calls[1].message, "Job completed successfully");
    assert_eq!(calls[1].severity, Severity::Success);
}

#[tokio::test]
async fn nonzero_exit_fails_with_stderr() {
    let h = harness();
    let id = h.registry.start(sh("broken", "echo bad >&2; exit 3")).await;

    let job = finished(&h.registry, &id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.exit_code, Some(3));
    assert_eq!(job.error.as_deref().map(str::trim), Some("bad"));
    let last = h.notify.calls().pop().unwrap();
    assert_eq!(last.message, "Job failed");
    assert_eq!(last.severity, Severity::Error);
}

#[tokio::test]
async fn stop_kills_running_job() {
    let h = harness();
    let id = h.registry.start(sh("sleeper", "sleep 30")).await;
    let running = h.registry.get_job(&id).await.unwrap();
    assert!(running.is_running());
    assert!(running.pid.is_some());

    assert!(h.registry.stop(&id).await.unwrap());

    let job = h.registry.get_job(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Stopped);
    assert!(job.end_time.is_some());
    assert!(job.pid.is_none());
    let last = h.notify.calls().pop().unwrap();
    assert_eq!(last.message, "Job stopped");
    assert_eq!(last.severity, Severity::Warning);

    // Second stop is a no-op
    assert!(!h.registry.stop(&id).await.unwrap());
    assert_eq!(h.notify.calls().len(), 2);
}

#[tokio::test]
async fn stop_takes_down_the_process_group() {
    let h = harness();
    let id = h
        .registry
        .start(sh("tree", "sleep 30 & echo $!; wait"))
        .await;
    // Let the shell report the background pid
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stopped = tokio::time::timeout(Duration::from_secs(10), h.registry.stop(&id))
        .await
        .unwrap()
        .unwrap();

    assert!(stopped);
    let job = h.registry.get_job(&id).await.unwrap();
    let sleeper: i32 = job.output.unwrap().trim().parse().unwrap();
    assert_gone(sleeper).await;
}

#[tokio::test]
async fn exit_with_lingering_descendant_still_finishes() {
    let h = harness();
    let id = h
        .registry
        .start(sh("bg", "echo hi; sleep 12 & echo $!"))
        .await;

    let job = finished(&h.registry, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    let mut lines = job.output.as_deref().unwrap().lines();
    assert_eq!(lines.next(), Some("hi"));
    let sleeper: i32 = lines.next().unwrap().trim().parse().unwrap();
    assert_gone(sleeper).await;
}

#[tokio::test]
async fn stop_while_descendant_holds_output_returns_promptly() {
    let h = harness();
    let id = h.registry.start(sh("bg", "echo hi; sleep 12 &")).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stopped = tokio::time::timeout(Duration::from_secs(5), h.registry.stop(&id))
        .await
        .expect("stop hung on open output")
        .unwrap();

    assert!(stopped);
    let job = h.registry.get_job(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Stopped);
    assert_eq!(job.output.as_deref().map(str::trim), Some("hi"));
}

#[tokio::test]
async fn stopping_a_finished_job_changes_nothing() {
    let h = harness();
    let id = h.registry.start(sh("quick", "true")).await;
    let before = finished(&h.registry, &id).await;

    assert!(!h.registry.stop(&id).await.unwrap());

    assert_eq!(h.registry.get_job(&id).await.unwrap(), before);
    assert_eq!(before.status, JobStatus::Completed);
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let h = harness();
    let missing = JobId::new("job-404");

    assert!(matches!(
        h.registry.stop(&missing).await,
        Err(EngineError::JobNotFound(_))
    ));
    assert!(matches!(
        h.registry.remove(&missing).await,
        Err(EngineError::JobNotFound(_))
    ));
    assert!(h.registry.get_job(&missing).await.is_none());
}

#[tokio::test]
async fn launch_failure_records_failed_job() {
    let h = harness();
    h.process.set_launch_error("missing-tool", "No such file or directory");

    let id = h
        .registry
        .start(JobRequest::new("ghost", "missing-tool", "--flag"))
        .await;

    let job = h.registry.get_job(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.pid.is_none());
    assert!(job
        .error
        .as_deref()
        .unwrap()
        .contains("No such file or directory"));

    let calls = h.notify.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].message.starts_with("Failed to start: "));
    assert_eq!(calls[0].severity, Severity::Error);
}

#[tokio::test]
async fn unparseable_arguments_fail_to_start() {
    let h = harness();
    let id = h
        .registry
        .start(JobRequest::new("quotes", "echo", "\"unterminated"))
        .await;

    let job = h.registry.get_job(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(h.process.calls().is_empty());
}

#[tokio::test]
async fn concurrent_jobs_get_distinct_ids() {
    let h = harness();
    let a = h.registry.start(sh("a", "sleep 30")).await;
    let b = h.registry.start(sh("b", "sleep 30")).await;

    assert_ne!(a, b);
    let running: Vec<_> = h
        .registry
        .running_jobs()
        .await
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(running, [a.clone(), b.clone()]);

    h.registry.shutdown().await;

    assert!(h.registry.running_jobs().await.is_empty());
    let all = h.registry.get_all_jobs().await;
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|j| j.status == JobStatus::Stopped));
}

#[tokio::test]
async fn remove_stops_and_forgets() {
    let h = harness();
    let id = h.registry.start(sh("doomed", "sleep 30")).await;

    let removed = h.registry.remove(&id).await.unwrap();

    assert_eq!(removed.status, JobStatus::Stopped);
    assert!(h.registry.get_job(&id).await.is_none());
    assert!(h.registry.get_all_jobs().await.is_empty());
}

#[tokio::test]
async fn remove_finished_job() {
    let h = harness();
    let id = h.registry.start(sh("done", "exit 0")).await;
    finished(&h.registry, &id).await;

    let removed = h.registry.remove(&id).await.unwrap();
    assert_eq!(removed.status, JobStatus::Completed);
    assert!(h.registry.get_all_jobs().await.is_empty());
}

#[tokio::test]
async fn job_runs_in_working_directory() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let id = h
        .registry
        .start(JobRequest::new("where", "pwd", "").in_dir(dir.path()))
        .await;

    let job = finished(&h.registry, &id).await;

    let reported = std::fs::canonicalize(job.output.unwrap().trim()).unwrap();
    assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
}

#[tokio::test]
async fn spawn_receives_parsed_arguments() {
    let h = harness();
    let id = h
        .registry
        .start(JobRequest::new("args", "echo", "one 'two three'"))
        .await;
    finished(&h.registry, &id).await;

    let calls = h.process.calls();
    assert_eq!(calls[0].spec.program, "echo");
    assert_eq!(calls[0].spec.args, ["one", "two three"]);
    assert_eq!(calls[0].timeout, None);
}
