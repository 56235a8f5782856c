// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolution of plugin and script names to runnable commands

mod directory;

pub use directory::DirectoryResolver;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeResolver;

use crate::process::{CommandSpec, ProcessError};
use async_trait::async_trait;
use dash_core::TaskKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from target resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A plugin or script turned into a concrete command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl ResolvedTarget {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build the command, appending user arguments and honouring a
    /// working directory override
    pub fn command(
        &self,
        arguments: Option<&str>,
        working_dir: Option<&Path>,
    ) -> Result<CommandSpec, ProcessError> {
        let spec = CommandSpec::new(&self.program)
            .args(self.args.iter().cloned())
            .arg_string(arguments.unwrap_or_default())?;
        Ok(spec.in_dir(working_dir.unwrap_or(&self.working_dir)))
    }
}

/// Adapter for locating task targets
#[async_trait]
pub trait TargetResolver: Clone + Send + Sync + 'static {
    /// `Ok(None)` when no target of that kind and name exists
    async fn resolve(
        &self,
        kind: TaskKind,
        name: &str,
    ) -> Result<Option<ResolvedTarget>, ResolveError>;
}
