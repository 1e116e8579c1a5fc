// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skylark-config: project configuration for the Skylark runtime.
//!
//! A project is any directory with a `.skai/` subdirectory; `.skai/`
//! holds `config.yaml`, per-assistant prompt and knowledge trees, and
//! per-tool source trees. This crate loads and validates that layout.

pub mod assistant;
pub mod project;
pub mod schema;

pub use assistant::{Assistant, AssistantError, AssistantSet};
pub use project::{find_project_root, Project, ProjectError, SKAI_DIR};
pub use schema::{
    AuditLogConfig, Config, ConfigError, FilePermissionsConfig, FileWatchConfig, ModelConfig,
    SecurityConfig, ToolConfig, WorkersConfig,
};
