// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process memory cgroups (Linux).
//!
//! Each limited process gets its own `skylark-<pid>` cgroup under the
//! memory controller root: v2 writes `memory.max`, v1 falls back to
//! `memory.limit_in_bytes` (+ `memory.memsw.limit_in_bytes` when
//! writable). Cleanup migrates the process back to the parent group and
//! removes the directory; it runs on every exit path, including kills.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CgroupVersion {
    V2,
    V1,
}

/// A created per-process cgroup directory.
#[derive(Debug)]
pub(super) struct CgroupGuard {
    dir: PathBuf,
    parent_procs: PathBuf,
    version: CgroupVersion,
}

#[cfg(target_os = "linux")]
fn detect_root() -> Option<(PathBuf, CgroupVersion)> {
    let v2 = Path::new("/sys/fs/cgroup");
    if v2.join("cgroup.controllers").exists() {
        return Some((v2.to_path_buf(), CgroupVersion::V2));
    }
    let v1 = Path::new("/sys/fs/cgroup/memory");
    if v1.is_dir() {
        return Some((v1.to_path_buf(), CgroupVersion::V1));
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn detect_root() -> Option<(PathBuf, CgroupVersion)> {
    None
}

impl CgroupGuard {
    /// Create `skylark-<pid>` under the detected controller root and move
    /// the process into it.
    pub(super) fn create(pid: u32, max_memory_mb: u64) -> io::Result<Self> {
        let (root, version) = detect_root().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Unsupported, "no cgroup controller found")
        })?;
        Self::create_at(&root, version, pid, max_memory_mb)
    }

    /// Create the group under an explicit root (separated for tests).
    pub(super) fn create_at(
        root: &Path,
        version: CgroupVersion,
        pid: u32,
        max_memory_mb: u64,
    ) -> io::Result<Self> {
        let dir = root.join(format!("skylark-{}", pid));
        std::fs::create_dir(&dir)?;
        let guard = Self {
            dir: dir.clone(),
            parent_procs: root.join("cgroup.procs"),
            version,
        };
        let bytes = max_memory_mb.saturating_mul(1024 * 1024);
        let result = match version {
            CgroupVersion::V2 => std::fs::write(dir.join("memory.max"), bytes.to_string()),
            CgroupVersion::V1 => {
                std::fs::write(dir.join("memory.limit_in_bytes"), bytes.to_string()).map(|_| {
                    // memsw is only present when swap accounting is on.
                    let memsw = dir.join("memory.memsw.limit_in_bytes");
                    if memsw.exists() {
                        let _ = std::fs::write(&memsw, bytes.to_string());
                    }
                })
            }
        }
        .and_then(|_| std::fs::write(dir.join("cgroup.procs"), pid.to_string()));

        if let Err(e) = result {
            guard.cleanup(pid);
            return Err(e);
        }
        Ok(guard)
    }

    /// How many times the kernel OOM-killed inside this group (v2 only;
    /// v1 exposes no post-mortem counter).
    pub(super) fn oom_kill_count(&self) -> u64 {
        if self.version != CgroupVersion::V2 {
            return 0;
        }
        let Ok(events) = std::fs::read_to_string(self.dir.join("memory.events")) else {
            return 0;
        };
        parse_oom_kill(&events)
    }

    /// Migrate the process back to the parent group and remove the
    /// directory. Best-effort: the process is usually dead by now.
    pub(super) fn cleanup(&self, pid: u32) {
        let _ = std::fs::write(&self.parent_procs, pid.to_string());
        if let Err(e) = std::fs::remove_dir(&self.dir) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(dir = %self.dir.display(), error = %e, "cgroup cleanup failed");
            }
        }
    }

    pub(super) fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Parse the `oom_kill` counter out of a v2 `memory.events` file.
fn parse_oom_kill(events: &str) -> u64 {
    events
        .lines()
        .find_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("oom_kill"), Some(n)) => n.parse().ok(),
                _ => None,
            }
        })
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "cgroup_tests.rs"]
mod tests;
