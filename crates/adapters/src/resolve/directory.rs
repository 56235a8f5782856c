// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolver backed by the dashboard's plugin and script directories

use super::{ResolveError, ResolvedTarget, TargetResolver};
use async_trait::async_trait;
use dash_core::TaskKind;
use std::path::{Path, PathBuf};

/// Looks up `<root>/plugins/<name>.*` and `<root>/scripts/<name>.*`
#[derive(Clone, Debug)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir_for(&self, kind: TaskKind) -> PathBuf {
        match kind {
            TaskKind::Plugin => self.root.join("plugins"),
            TaskKind::Script => self.root.join("scripts"),
        }
    }
}

/// Interpreter command for a target file, chosen by extension
pub fn interpreter_for(path: &Path) -> (String, Vec<String>) {
    let file = path.display().to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("csx") => ("dotnet".into(), vec!["script".into(), file]),
        Some("ps1") => (
            "pwsh".into(),
            vec!["-NoProfile".into(), "-File".into(), file],
        ),
        Some("sh") => ("sh".into(), vec![file]),
        Some("py") => ("python3".into(), vec![file]),
        _ => (file, Vec::new()),
    }
}

#[async_trait]
impl TargetResolver for DirectoryResolver {
    async fn resolve(
        &self,
        kind: TaskKind,
        name: &str,
    ) -> Result<Option<ResolvedTarget>, ResolveError> {
        let dir = self.dir_for(kind);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ResolveError::Scan { path: dir, source }),
        };

        let mut matches = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => return Err(ResolveError::Scan { path: dir, source }),
            };
            let path = entry.path();
            let stem_matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case(name));
            if stem_matches && path.is_file() {
                matches.push(path);
            }
        }

        // Directory order is unspecified; pick deterministically
        matches.sort();
        let Some(path) = matches.into_iter().next() else {
            tracing::debug!(%kind, name, dir = %dir.display(), "target not found");
            return Ok(None);
        };

        let (program, args) = interpreter_for(&path);
        let working_dir = path.parent().map(Path::to_path_buf).unwrap_or(dir);
        Ok(Some(ResolvedTarget {
            program,
            args,
            working_dir,
        }))
    }
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
