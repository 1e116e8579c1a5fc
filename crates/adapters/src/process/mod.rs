// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process management with enforced resource limits.
//!
//! A [`ProcessManager`] hands out [`ProcessHandle`]s; each handle owns one
//! child process and its resource envelope: rlimits applied in the
//! child's `pre_exec`, an optional per-process memory cgroup on Linux,
//! and a CPU-time kill timer scheduled through the [`Clock`].
//!
//! Lifecycle: `new_handle -> (set_limits)* -> start -> wait`. The
//! manager's table maps live PIDs to handles; an entry leaves the table
//! only after the child has been waited (or killed and waited).

mod cgroup;
mod handle;
#[cfg(unix)]
mod rlimit;

pub use handle::ProcessHandle;

use parking_lot::Mutex;
use skylark_core::{Clock, ResourceLimits};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Signals a handle can deliver to its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT: ask the child to wind down.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGKILL: no questions asked.
    Kill,
}

/// Errors from process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("process already started")]
    AlreadyStarted,
    #[error("process not running")]
    NotRunning,
    #[error("limits cannot change while the process is running")]
    InvalidLimits,
    #[error("process not found: {0}")]
    NotFound(u32),
    #[error("spawn failed for {name}: {source}")]
    SpawnFailed {
        name: String,
        source: std::io::Error,
    },
    #[error("CPU time limit exceeded: {name} killed after {limit_ms}ms")]
    CpuLimitExceeded { name: String, limit_ms: u64 },
    #[error("out of memory: {name} exceeded {limit_mb}MB")]
    OutOfMemory { name: String, limit_mb: u64 },
    #[error("{name} exited with status {code}")]
    Exited { name: String, code: i32 },
    #[error("memory limits not supported on this platform")]
    MemoryUnsupported,
    #[error("signal failed: {0}")]
    SignalFailed(String),
    #[error("wait failed: {0}")]
    WaitFailed(String),
}

pub(crate) type HandleTable<C> = Mutex<HashMap<u32, Arc<ProcessHandle<C>>>>;

/// Spawns and tracks child processes.
pub struct ProcessManager<C: Clock> {
    clock: C,
    default_limits: Mutex<ResourceLimits>,
    table: Arc<HandleTable<C>>,
}

impl<C: Clock> ProcessManager<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            default_limits: Mutex::new(ResourceLimits::default()),
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a handle for `argv` named `name`. The handle starts with the
    /// manager's default limits; nothing is spawned until `start`.
    pub fn new_handle(&self, name: impl Into<String>, argv: Vec<String>) -> Arc<ProcessHandle<C>> {
        ProcessHandle::new(
            name.into(),
            argv,
            *self.default_limits.lock(),
            self.clock.clone(),
            Arc::downgrade(&self.table),
        )
    }

    /// Look up a running process by PID.
    pub fn get(&self, pid: u32) -> Result<Arc<ProcessHandle<C>>, ProcessError> {
        self.table
            .lock()
            .get(&pid)
            .cloned()
            .ok_or(ProcessError::NotFound(pid))
    }

    /// Handles for every currently running process.
    pub fn list(&self) -> Vec<Arc<ProcessHandle<C>>> {
        self.table.lock().values().cloned().collect()
    }

    pub fn set_default_limits(&self, limits: ResourceLimits) {
        *self.default_limits.lock() = limits;
    }

    pub fn default_limits(&self) -> ResourceLimits {
        *self.default_limits.lock()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
