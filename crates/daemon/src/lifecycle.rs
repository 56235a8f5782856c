// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dash_adapters::{
    DesktopNotifier, DirectoryResolver, NoOpNotifyAdapter, Notification, NotifyAdapter,
    NotifyError, TokioProcessAdapter, TracedNotifyAdapter, TracedProcessAdapter, TracedResolver,
};
use dash_core::{SystemClock, UuidIdGen};
use dash_engine::{EngineError, JobRegistry, SchedulerConfig, SchedulerDeps, TaskScheduler};
use dash_storage::{HistoryLog, TaskStore, DEFAULT_HISTORY_LIMIT};
use fs2::FileExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Environment variable overriding the data root
pub const ROOT_ENV: &str = "DASH_ROOT";

/// Settings file name under the data root
pub const SETTINGS_FILE: &str = "dashd.toml";

type DaemonProcess = TracedProcessAdapter<TokioProcessAdapter>;
type DaemonNotify = TracedNotifyAdapter<DaemonNotifier>;

/// Scheduler with concrete adapter types (wrapped with tracing)
pub type DaemonScheduler = TaskScheduler<
    TracedResolver<DirectoryResolver>,
    DaemonProcess,
    DaemonNotify,
    SystemClock,
    UuidIdGen,
>;

/// Job registry sharing the scheduler's process and notify adapters
pub type DaemonJobs = JobRegistry<DaemonProcess, DaemonNotify, SystemClock, UuidIdGen>;

/// Tunables read from `dashd.toml`; every key is optional
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub tick_interval_secs: u64,
    pub task_timeout_secs: u64,
    pub history_limit: usize,
    pub notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            task_timeout_secs: 300,
            history_limit: DEFAULT_HISTORY_LIMIT,
            notifications: true,
        }
    }
}

impl Settings {
    /// Parse settings, treating a missing file as all defaults
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|source| LifecycleError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Never zero; a zero-period interval would spin
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs.max(1))
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Data root holding tasks, history, plugins and scripts
    pub root: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    pub settings: Settings,
}

impl Config {
    /// Build the config for a data root, reading `dashd.toml` if present
    pub fn load(root: &Path) -> Result<Self, LifecycleError> {
        let settings = Settings::load(&root.join(SETTINGS_FILE))?;
        Ok(Self::with_settings(root, settings))
    }

    pub fn with_settings(root: &Path, settings: Settings) -> Self {
        Self {
            root: root.to_path_buf(),
            lock_path: root.join("dashd.lock"),
            log_path: root.join("logs").join("dashd.log"),
            settings,
        }
    }
}

/// Resolve the data root: `DASH_ROOT`, else the platform data directory
pub fn default_root() -> Result<PathBuf, LifecycleError> {
    if let Ok(root) = std::env::var(ROOT_ENV) {
        if !root.is_empty() {
            return Ok(PathBuf::from(root));
        }
    }
    dirs::data_dir()
        .map(|dir| dir.join("cli-dashboard"))
        .ok_or(LifecycleError::NoDataDir)
}

/// Desktop notifications, or nothing when disabled in settings
#[derive(Clone, Copy, Debug)]
pub enum DaemonNotifier {
    Desktop(DesktopNotifier),
    Off(NoOpNotifyAdapter),
}

impl DaemonNotifier {
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.notifications {
            Self::Desktop(DesktopNotifier::new())
        } else {
            Self::Off(NoOpNotifyAdapter::new())
        }
    }
}

#[async_trait]
impl NotifyAdapter for DaemonNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self {
            Self::Desktop(inner) => inner.notify(notification).await,
            Self::Off(inner) => inner.notify(notification).await,
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Invalid settings in {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub scheduler: Arc<DaemonScheduler>,
    pub jobs: DaemonJobs,
    shutdown: CancellationToken,
    ticker: Option<JoinHandle<()>>,
    /// When daemon started
    pub start_time: Instant,
}

impl DaemonState {
    /// Stop the ticker, kill running jobs and release the lock
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop ticking; an in-flight tick finishes first
        self.shutdown.cancel();
        if let Some(ticker) = self.ticker.take() {
            if let Err(e) = ticker.await {
                warn!("Scheduler loop ended abnormally: {}", e);
            }
        }
        self.scheduler.stop();

        // 2. Kill background jobs
        self.jobs.shutdown().await;

        // 3. Remove PID file; the lock itself goes with self.lock_file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
        Ok(())
    }
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        // The lock file belongs to the daemon that holds it
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create data root
    std::fs::create_dir_all(&config.root)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing one root
    let mut lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Set up adapters (wrapped with tracing for observability)
    let settings = &config.settings;
    let process = TracedProcessAdapter::new(TokioProcessAdapter::new());
    let notify = TracedNotifyAdapter::new(DaemonNotifier::from_settings(settings));
    let resolver = TracedResolver::new(DirectoryResolver::new(&config.root));

    // 4. Load tasks and refresh stale schedules
    let scheduler = Arc::new(TaskScheduler::new(
        SchedulerDeps {
            resolver,
            process: process.clone(),
            notify: notify.clone(),
            store: TaskStore::new(&config.root),
            history: HistoryLog::new(&config.root).with_limit(settings.history_limit),
        },
        SystemClock,
        UuidIdGen,
        SchedulerConfig {
            task_timeout: settings.task_timeout(),
        },
    ));
    scheduler.start().await?;

    let status = scheduler.status().await;
    info!(
        total = status.total_tasks,
        enabled = status.enabled_tasks,
        next_due = ?status.next_due.map(|(_, at)| at),
        "Loaded scheduled tasks"
    );

    // 5. Start ticking (LAST - only after everything else is in place)
    let shutdown = CancellationToken::new();
    let ticker = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        let shutdown = shutdown.clone();
        let interval = settings.tick_interval();
        async move { scheduler.run(interval, shutdown).await }
    });

    info!("Daemon started with data root: {}", config.root.display());

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        scheduler,
        jobs: JobRegistry::new(process, notify, SystemClock, UuidIdGen),
        shutdown,
        ticker: Some(ticker),
        start_time: Instant::now(),
    })
}

/// Begins each startup attempt in the log: `--- dashd: starting (pid: N) ---`
const STARTUP_MARKER_PREFIX: &str = "--- dashd: starting (pid: ";

/// Append the startup marker to the log, creating its directory
pub fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Append a startup failure to the log without going through tracing
pub fn write_startup_error(config: &Config, error: &LifecycleError) {
    let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
