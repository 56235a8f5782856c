// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake target resolver for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ResolveError, ResolvedTarget, TargetResolver};
use async_trait::async_trait;
use dash_core::TaskKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Resolver answering from an in-memory table
#[derive(Clone, Default)]
pub struct FakeResolver {
    targets: Arc<Mutex<HashMap<(TaskKind, String), ResolvedTarget>>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target; lookups ignore case like the directory resolver
    pub fn insert(&self, kind: TaskKind, name: &str, target: ResolvedTarget) {
        self.targets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((kind, name.to_lowercase()), target);
    }

    pub fn with_target(self, kind: TaskKind, name: &str, target: ResolvedTarget) -> Self {
        self.insert(kind, name, target);
        self
    }
}

#[async_trait]
impl TargetResolver for FakeResolver {
    async fn resolve(
        &self,
        kind: TaskKind,
        name: &str,
    ) -> Result<Option<ResolvedTarget>, ResolveError> {
        Ok(self
            .targets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(kind, name.to_lowercase()))
            .cloned())
    }
}
