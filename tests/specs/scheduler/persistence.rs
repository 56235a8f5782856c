// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler persistence specs
//!
//! Verify that tasks survive restarts and that missed runs are not replayed.

use crate::prelude::*;

#[tokio::test]
async fn tasks_file_uses_camel_case_fields() {
    let world = World::new();
    let scheduler = world.started().await;
    scheduler
        .add_task(NewTask::new("Backup", TaskKind::Plugin, "backup", "0 2 * * *"))
        .await
        .unwrap();

    let json = world.tasks_file();
    assert!(json.contains("\"cronExpression\": \"0 2 * * *\""));
    assert!(json.contains("\"type\": \"Plugin\""));
    assert!(json.contains("\"nextExecutionTime\""));
}

#[tokio::test]
async fn restart_reschedules_missed_runs_without_executing() {
    let world = World::new();
    world.script("backup", "echo ran\n");
    let task = {
        let scheduler = world.started().await;
        scheduler
            .add_task(NewTask::new("Backup", TaskKind::Script, "backup", "0 10 * * *"))
            .await
            .unwrap()
    };

    // Down for two days
    world.clock.advance_minutes(2 * 24 * 60);
    let scheduler = world.started().await;

    let reloaded = scheduler.get_task(&task.id).await.unwrap();
    assert!(reloaded.next_execution_time.unwrap() > world.clock_now());
    assert_eq!(reloaded.execution_count, 0);
    assert!(scheduler.tick().await.runs.is_empty());
    assert!(scheduler.history(None, 10).is_empty());
}

#[tokio::test]
async fn edits_are_persisted_immediately() {
    let world = World::new();
    let scheduler = world.started().await;
    let keep = scheduler
        .add_task(NewTask::new("Keep", TaskKind::Script, "keep", "0 * * * *"))
        .await
        .unwrap();
    let gone = scheduler
        .add_task(NewTask::new("Drop", TaskKind::Script, "drop", "0 * * * *"))
        .await
        .unwrap();

    scheduler
        .update_task(
            &keep.id,
            TaskUpdate::default().name("Kept").cron_expression("30 * * * *"),
        )
        .await
        .unwrap();
    scheduler.delete_task(&gone.id).await.unwrap();

    let reloaded = world.started().await;
    let tasks = reloaded.get_all_tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "Kept");
    assert_eq!(tasks[0].cron_expression, "30 * * * *");
}

#[tokio::test]
async fn invalid_expressions_are_not_saved() {
    let world = World::new();
    let scheduler = world.started().await;

    let err = scheduler
        .add_task(NewTask::new("Never", TaskKind::Script, "x", "0 0 31 2 *"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidCron { .. }));
    assert!(scheduler.get_all_tasks().await.is_empty());
}
