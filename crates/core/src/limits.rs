// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process resource ceilings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource limits applied to a spawned process.
///
/// A zero value means "unset": the platform default (or no limit)
/// applies for that dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Soft CPU-time budget; the process is killed when it elapses.
    pub max_cpu_time: Duration,
    /// Memory ceiling in megabytes (cgroup-enforced on Linux).
    pub max_memory_mb: u64,
    /// Largest file the process may create, in megabytes (RLIMIT_FSIZE).
    pub max_file_size_mb: u64,
    /// Open file descriptor ceiling (RLIMIT_NOFILE).
    pub max_files: u64,
    /// Child process ceiling (RLIMIT_NPROC).
    pub max_processes: u64,
}

impl ResourceLimits {
    /// No limits in any dimension.
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn is_unlimited(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_cpu_time(mut self, d: Duration) -> Self {
        self.max_cpu_time = d;
        self
    }

    pub fn with_memory_mb(mut self, mb: u64) -> Self {
        self.max_memory_mb = mb;
        self
    }

    pub fn with_file_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size_mb = mb;
        self
    }

    pub fn with_max_files(mut self, n: u64) -> Self {
        self.max_files = n;
        self
    }

    pub fn with_max_processes(mut self, n: u64) -> Self {
        self.max_processes = n;
        self
    }
}

#[cfg(test)]
#[path = "limits_tests.rs"]
mod tests;
