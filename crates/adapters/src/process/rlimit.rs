// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rlimit probing and application.
//!
//! The parent probes which requested ceilings the kernel will refuse
//! (so the handle can report them as `unsupported: <name>`), and the
//! child applies them between fork and exec. A refused dimension never
//! blocks the exec; the child falls back to the strictest ceiling the
//! kernel allows.

use skylark_core::ResourceLimits;

pub(super) const DIM_FILES: &str = "max_files";
pub(super) const DIM_PROCESSES: &str = "max_processes";
pub(super) const DIM_FILE_SIZE: &str = "max_file_size";

// glibc types the resource argument differently from musl and the BSDs.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
type Resource = libc::__rlimit_resource_t;
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
type Resource = libc::c_int;

/// Hard ceilings the host kernel enforces on this process.
pub(super) struct HostCaps {
    files: libc::rlim_t,
    processes: libc::rlim_t,
    file_size: libc::rlim_t,
    /// Privileged processes may raise hard limits, so nothing is
    /// refused up front.
    can_raise: bool,
}

fn hard_limit(resource: Resource) -> libc::rlim_t {
    let mut rl = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit writes into a struct we own.
    let rc = unsafe { libc::getrlimit(resource, &mut rl) };
    if rc == 0 {
        rl.rlim_max
    } else {
        libc::RLIM_INFINITY
    }
}

pub(super) fn host_caps() -> HostCaps {
    HostCaps {
        files: hard_limit(libc::RLIMIT_NOFILE),
        processes: hard_limit(libc::RLIMIT_NPROC),
        file_size: hard_limit(libc::RLIMIT_FSIZE),
        // SAFETY: geteuid has no preconditions.
        can_raise: unsafe { libc::geteuid() } == 0,
    }
}

/// Requested dimensions the kernel will reject, judged against the
/// probed hard ceilings. The process still starts without them.
pub(super) fn rejected_dims(limits: &ResourceLimits) -> Vec<&'static str> {
    rejected_against(limits, &host_caps())
}

fn rejected_against(limits: &ResourceLimits, caps: &HostCaps) -> Vec<&'static str> {
    let mut rejected = Vec::new();
    if caps.can_raise {
        return rejected;
    }
    if limits.max_files > 0 && limits.max_files as libc::rlim_t > caps.files {
        rejected.push(DIM_FILES);
    }
    if limits.max_processes > 0 && limits.max_processes as libc::rlim_t > caps.processes {
        rejected.push(DIM_PROCESSES);
    }
    let fsize_bytes = limits.max_file_size_mb.saturating_mul(1024 * 1024);
    if fsize_bytes > 0 && fsize_bytes as libc::rlim_t > caps.file_size {
        rejected.push(DIM_FILE_SIZE);
    }
    rejected
}

/// Set one ceiling, watching the return code: when the kernel refuses
/// the requested value (already reported by the parent's probe), clamp
/// the soft limit under the current hard cap instead of running with no
/// ceiling at all.
fn set_or_clamp(resource: Resource, want: libc::rlim_t) {
    let requested = libc::rlimit {
        rlim_cur: want,
        rlim_max: want,
    };
    // SAFETY: setrlimit/getrlimit are plain syscalls, safe between fork
    // and exec.
    unsafe {
        if libc::setrlimit(resource, &requested) == 0 {
            return;
        }
        let mut current = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        if libc::getrlimit(resource, &mut current) == 0 {
            let clamped = libc::rlimit {
                rlim_cur: want.min(current.rlim_max),
                rlim_max: current.rlim_max,
            };
            libc::setrlimit(resource, &clamped);
        }
    }
}

/// Apply descriptor, subprocess, and file-size ceilings.
///
/// Runs in the child's `pre_exec`; only async-signal-safe calls are
/// allowed here, so failures are handled by clamping, never by aborting
/// the exec.
pub(super) fn apply(limits: &ResourceLimits) {
    if limits.max_files > 0 {
        set_or_clamp(libc::RLIMIT_NOFILE, limits.max_files as libc::rlim_t);
    }
    if limits.max_processes > 0 {
        set_or_clamp(libc::RLIMIT_NPROC, limits.max_processes as libc::rlim_t);
    }
    if limits.max_file_size_mb > 0 {
        let bytes = limits.max_file_size_mb.saturating_mul(1024 * 1024);
        set_or_clamp(libc::RLIMIT_FSIZE, bytes as libc::rlim_t);
    }
}

#[cfg(test)]
#[path = "rlimit_tests.rs"]
mod tests;
