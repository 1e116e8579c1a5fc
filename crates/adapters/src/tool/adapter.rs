// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges a managed tool into the provider's tool-call loop.

use super::ToolManager;
use crate::provider::ToolExecutor;
use async_trait::async_trait;
use skylark_core::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// [`ToolExecutor`] backed by a [`ToolManager`] entry.
pub struct ToolCallAdapter<C: Clock> {
    manager: Arc<ToolManager<C>>,
    name: String,
    env_overrides: BTreeMap<String, String>,
}

impl<C: Clock> ToolCallAdapter<C> {
    pub fn new(
        manager: Arc<ToolManager<C>>,
        name: impl Into<String>,
        env_overrides: BTreeMap<String, String>,
    ) -> Self {
        Self {
            manager,
            name: name.into(),
            env_overrides,
        }
    }
}

#[async_trait]
impl<C: Clock> ToolExecutor for ToolCallAdapter<C> {
    async fn execute(&self, input_json: &str) -> Result<String, String> {
        let bytes = self
            .manager
            .execute(&self.name, input_json, &self.env_overrides)
            .await
            .map_err(|e| e.to_string())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
