// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-supplied tool programs.
//!
//! A tool is a standalone executable living in `<tools_dir>/<name>/`,
//! compiled from `main.<ext>` next to it. The ABI is three invocations:
//! `--usage` (schema JSON on stdout), `--health` (`{"status": true}`),
//! and the normal call (JSON object on stdin, JSON object on stdout).
//! The [`ToolManager`] compiles, introspects, health-checks, executes,
//! and hot-recompiles tools when their source changes.

mod adapter;
mod builtin;
mod manager;
mod schema;
mod watcher;

pub use adapter::ToolCallAdapter;
pub use builtin::BUILTIN_TOOLS;
pub use manager::{ToolBuilder, ToolManager};
pub use schema::{validate_input, EnvVar, ToolSchema, UsageOutput};
pub use watcher::ToolWatcher;

use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

/// A loaded, compiled tool.
#[derive(Debug, Clone)]
pub struct Tool {
    pub name: String,
    /// Path to the compiled binary.
    pub path: PathBuf,
    pub last_built: SystemTime,
    pub schema: ToolSchema,
}

/// Errors from tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("tool source missing: {0}")]
    SourceMissing(PathBuf),
    #[error("compile failed for {name}: {detail}")]
    CompileFailed { name: String, detail: String },
    #[error("usage introspection failed for {name}: {detail}")]
    UsageFailed { name: String, detail: String },
    #[error("health check failed for {name}: {detail}")]
    HealthFailed { name: String, detail: String },
    #[error("invalid tool input: {0}")]
    InvalidInput(String),
    #[error("execution failed for {name}: {detail}")]
    ExecFailed { name: String, detail: String },
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("watch error: {0}")]
    Watch(String),
}
