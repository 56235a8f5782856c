// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: a temporary data root with real scripts

pub use dash_adapters::{FakeNotifyAdapter, Severity};
pub use dash_core::{
    FakeClock, JobRequest, JobStatus, NewTask, SequentialIdGen, TaskKind, TaskStatus, TaskUpdate,
};
pub use dash_engine::{EngineError, SchedulerConfig};
pub use std::time::Duration;

use chrono::{DateTime, Utc};
use dash_adapters::{DirectoryResolver, TokioProcessAdapter};
use dash_core::Clock;
use dash_engine::{JobRegistry, SchedulerDeps, TaskScheduler};
use dash_storage::{HistoryLog, TaskStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub type Scheduler = TaskScheduler<
    DirectoryResolver,
    TokioProcessAdapter,
    FakeNotifyAdapter,
    FakeClock,
    SequentialIdGen,
>;

pub type Jobs = JobRegistry<TokioProcessAdapter, FakeNotifyAdapter, FakeClock, SequentialIdGen>;

/// A data root with `scripts/` and `plugins/` directories
pub struct World {
    dir: TempDir,
    pub clock: FakeClock,
    pub notify: FakeNotifyAdapter,
    pub history_limit: usize,
    pub task_timeout: Duration,
}

impl World {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::create_dir_all(dir.path().join("plugins")).unwrap();
        Self {
            dir,
            clock: FakeClock::new(),
            notify: FakeNotifyAdapter::new(),
            history_limit: 500,
            task_timeout: Duration::from_secs(30),
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `scripts/<name>.sh`
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root().join("scripts").join(format!("{name}.sh"));
        std::fs::write(&path, body).unwrap();
        path
    }

    /// A scheduler over this root; each call simulates a fresh process
    pub fn scheduler(&self) -> Scheduler {
        TaskScheduler::new(
            SchedulerDeps {
                resolver: DirectoryResolver::new(self.root()),
                process: TokioProcessAdapter::new(),
                notify: self.notify.clone(),
                store: TaskStore::new(self.root()),
                history: HistoryLog::new(self.root()).with_limit(self.history_limit),
            },
            self.clock.clone(),
            SequentialIdGen::new("task"),
            SchedulerConfig {
                task_timeout: self.task_timeout,
            },
        )
    }

    pub async fn started(&self) -> Scheduler {
        let scheduler = self.scheduler();
        scheduler.start().await.unwrap();
        scheduler
    }

    pub fn jobs(&self) -> Jobs {
        JobRegistry::new(
            TokioProcessAdapter::new(),
            self.notify.clone(),
            self.clock.clone(),
            SequentialIdGen::new("job"),
        )
    }

    pub fn tasks_file(&self) -> String {
        std::fs::read_to_string(self.root().join(dash_storage::TASKS_FILE)).unwrap()
    }
}

/// Poll a job until it leaves `Running`
pub async fn wait_for_job(jobs: &Jobs, id: &dash_core::JobId) -> dash_core::BackgroundJob {
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = jobs.get_job(id).await.unwrap();
        if !job.is_running() {
            return job;
        }
        assert!(std::time::Instant::now() < deadline, "job {id} never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
