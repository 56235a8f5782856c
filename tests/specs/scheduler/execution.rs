// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler execution specs
//!
//! Verify that due tasks run real scripts and leave history behind.

use crate::prelude::*;

#[tokio::test]
async fn due_script_runs_and_is_rescheduled() {
    let world = World::new();
    world.script("backup", "echo backed up\n");
    let scheduler = world.started().await;
    let task = scheduler
        .add_task(NewTask::new("Backup", TaskKind::Script, "backup", "*/5 * * * *"))
        .await
        .unwrap();

    // Not due yet
    assert!(scheduler.tick().await.runs.is_empty());

    world.clock.advance_minutes(5);
    let report = scheduler.tick().await;

    assert_eq!(report.executed(), [task.id.clone()]);
    assert_eq!(report.runs[0].status, TaskStatus::Success);
    assert!(report.runs[0].history.is_written());

    let task = scheduler.get_task(&task.id).await.unwrap();
    assert_eq!(task.execution_count, 1);
    assert_eq!(task.last_status, Some(TaskStatus::Success));
    assert_eq!(task.last_execution_time, Some(world.clock_now()));
    assert!(task.next_execution_time.unwrap() > world.clock_now());

    let history = scheduler.history(Some(&task.id), 10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].task_name, "Backup");
    assert_eq!(history[0].output.as_deref().map(str::trim), Some("backed up"));
    assert_eq!(history[0].error, None);

    // Ran once; the next tick at the same instant does nothing
    assert!(scheduler.tick().await.runs.is_empty());
}

#[tokio::test]
async fn failing_script_records_stderr_and_notifies() {
    let world = World::new();
    world.script("flaky", "echo disk full >&2\nexit 4\n");
    let scheduler = world.started().await;
    let task = scheduler
        .add_task(NewTask::new("Flaky", TaskKind::Script, "flaky", "* * * * *"))
        .await
        .unwrap();

    world.clock.advance_minutes(1);
    let run = scheduler.tick().await.runs.pop().unwrap();

    assert_eq!(run.status, TaskStatus::Failed);
    let entry = scheduler.history(Some(&task.id), 1).pop().unwrap();
    assert_eq!(entry.error.as_deref().map(str::trim), Some("disk full"));

    let calls = world.notify.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].title, "Task Failed");
    assert_eq!(calls[0].severity, Severity::Error);
    assert!(calls[0].message.starts_with("'Flaky' failed: disk full"));
}

#[tokio::test]
async fn missing_script_fails_without_launching() {
    let world = World::new();
    let scheduler = world.started().await;
    let task = scheduler
        .add_task(NewTask::new("Ghost", TaskKind::Script, "ghost", "* * * * *"))
        .await
        .unwrap();

    world.clock.advance_minutes(1);
    scheduler.tick().await;

    let entry = scheduler.history(Some(&task.id), 1).pop().unwrap();
    assert_eq!(entry.status, TaskStatus::Failed);
    assert_eq!(entry.error.as_deref(), Some("Script 'ghost' not found"));
    assert_eq!(scheduler.get_task(&task.id).await.unwrap().execution_count, 1);
}

#[tokio::test]
async fn script_names_match_case_insensitively() {
    let world = World::new();
    world.script("Report", "echo ok\n");
    let scheduler = world.started().await;
    let task = scheduler
        .add_task(NewTask::new("Report", TaskKind::Script, "report", "* * * * *"))
        .await
        .unwrap();

    let run = scheduler.run_now(&task.id).await.unwrap();
    assert_eq!(run.status, TaskStatus::Success);
}

#[tokio::test]
async fn arguments_and_working_directory_reach_the_script() {
    let world = World::new();
    world.script("args", "echo \"$1|$2|$(pwd)\"\n");
    let workdir = tempfile::tempdir().unwrap();
    let scheduler = world.started().await;
    let task = scheduler
        .add_task(
            NewTask::new("Args", TaskKind::Script, "args", "* * * * *")
                .with_arguments("first 'second word'")
                .with_working_directory(workdir.path()),
        )
        .await
        .unwrap();

    scheduler.run_now(&task.id).await.unwrap();

    let output = scheduler.history(Some(&task.id), 1).pop().unwrap().output.unwrap();
    let parts: Vec<&str> = output.trim().split('|').collect();
    assert_eq!(parts[0], "first");
    assert_eq!(parts[1], "second word");
    assert_eq!(
        std::fs::canonicalize(parts[2]).unwrap(),
        std::fs::canonicalize(workdir.path()).unwrap()
    );
}

#[tokio::test]
async fn overlong_run_is_killed_as_timeout() {
    let mut world = World::new();
    world.task_timeout = Duration::from_secs(1);
    world.script("hang", "echo starting\nsleep 30\n");
    let scheduler = world.started().await;
    let task = scheduler
        .add_task(NewTask::new("Hang", TaskKind::Script, "hang", "* * * * *"))
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let run = scheduler.run_now(&task.id).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(run.status, TaskStatus::Timeout);
    let entry = scheduler.history(Some(&task.id), 1).pop().unwrap();
    assert_eq!(entry.output.as_deref().map(str::trim), Some("starting"));
    assert_eq!(entry.error.as_deref(), Some("timed out after 1s"));
}

#[tokio::test]
async fn backgrounded_descendant_cannot_outlast_the_timeout() {
    let mut world = World::new();
    world.task_timeout = Duration::from_secs(1);
    // The script exits at once but the sleeper inherits its stdout
    world.script("detach", "echo detached\nsleep 30 &\n");
    let scheduler = world.started().await;
    let task = scheduler
        .add_task(NewTask::new("Detach", TaskKind::Script, "detach", "* * * * *"))
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let run = scheduler.run_now(&task.id).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(run.status, TaskStatus::Timeout);
    let entry = scheduler.history(Some(&task.id), 1).pop().unwrap();
    assert_eq!(entry.output.as_deref().map(str::trim), Some("detached"));
}

#[tokio::test]
async fn one_failing_task_does_not_stop_the_others() {
    let world = World::new();
    world.script("good", "echo fine\n");
    let scheduler = world.started().await;
    let ghost = scheduler
        .add_task(NewTask::new("Ghost", TaskKind::Script, "ghost", "* * * * *"))
        .await
        .unwrap();
    let good = scheduler
        .add_task(
            NewTask::new("Good", TaskKind::Script, "good", "* * * * *").notify_on_completion(true),
        )
        .await
        .unwrap();

    world.clock.advance_minutes(1);
    let report = scheduler.tick().await;

    assert_eq!(report.executed(), [ghost.id, good.id]);
    assert_eq!(report.runs[0].status, TaskStatus::Failed);
    assert_eq!(report.runs[1].status, TaskStatus::Success);
    assert_eq!(world.notify.titles(), ["Task Failed", "Task Completed"]);
}

#[tokio::test]
async fn history_keeps_only_the_newest_entries() {
    let mut world = World::new();
    world.history_limit = 3;
    world.script("tick", "true\n");
    let scheduler = world.started().await;
    let task = scheduler
        .add_task(NewTask::new("Tick", TaskKind::Script, "tick", "* * * * *"))
        .await
        .unwrap();

    for _ in 0..5 {
        world.clock.advance_minutes(1);
        scheduler.tick().await;
    }

    let history = scheduler.history(None, 100);
    assert_eq!(history.len(), 3);
    assert!(history
        .windows(2)
        .all(|w| w[0].execution_time >= w[1].execution_time));
    assert_eq!(history[0].execution_time, world.clock_now());
    assert_eq!(scheduler.get_task(&task.id).await.unwrap().execution_count, 5);
}

#[tokio::test]
async fn disabled_tasks_are_skipped_until_enabled() {
    let world = World::new();
    world.script("nightly", "true\n");
    let scheduler = world.started().await;
    let task = scheduler
        .add_task(NewTask::new("Nightly", TaskKind::Script, "nightly", "* * * * *").disabled())
        .await
        .unwrap();

    world.clock.advance_minutes(1);
    assert!(scheduler.tick().await.runs.is_empty());

    assert!(scheduler.toggle_task(&task.id).await.unwrap());
    world.clock.advance_minutes(1);
    assert_eq!(scheduler.tick().await.executed(), [task.id]);
}
