// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File access policy checks.
//!
//! Paths are normalized lexically (no symlink following) and checked in
//! order: blocked prefixes beat allowed prefixes, then the symlink rule,
//! then the size ceiling. Denials are reported to the audit log.

use crate::audit::{AuditEvent, AuditLog};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// A denial from [`FileGuard`].
#[derive(Debug, Clone, Error)]
pub enum GuardError {
    #[error("blocked path: {0}")]
    Blocked(PathBuf),
    #[error("access denied: {0} is outside the allowed paths")]
    AccessDenied(PathBuf),
    #[error("symlink denied: {0}")]
    SymlinkDenied(PathBuf),
    #[error("file too large: {path} is {size} bytes (max {max})")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },
}

impl GuardError {
    fn event_name(&self) -> &'static str {
        match self {
            GuardError::Blocked(_) => "blocked_path",
            GuardError::AccessDenied(_) => "access_denied",
            GuardError::SymlinkDenied(_) => "symlink_denied",
            GuardError::FileTooLarge { .. } => "file_too_large",
        }
    }

    fn path(&self) -> &Path {
        match self {
            GuardError::Blocked(p)
            | GuardError::AccessDenied(p)
            | GuardError::SymlinkDenied(p) => p,
            GuardError::FileTooLarge { path, .. } => path,
        }
    }
}

/// Configured policy for a guard instance.
#[derive(Debug, Clone, Default)]
pub struct GuardPolicy {
    /// Paths reads/writes must fall under. Empty means unrestricted.
    pub allowed_paths: Vec<PathBuf>,
    /// Paths that are always refused; beats `allowed_paths`.
    pub blocked_paths: Vec<PathBuf>,
    pub allow_symlinks: bool,
    /// Bytes; zero disables the ceiling.
    pub max_file_size: u64,
}

/// Checks file accesses against a [`GuardPolicy`].
pub struct FileGuard {
    allowed: Vec<PathBuf>,
    blocked: Vec<PathBuf>,
    allow_symlinks: bool,
    max_file_size: u64,
    audit: Option<Arc<AuditLog>>,
}

impl FileGuard {
    pub fn new(policy: GuardPolicy) -> Self {
        Self {
            allowed: policy.allowed_paths.iter().map(|p| clean_path(p)).collect(),
            blocked: policy.blocked_paths.iter().map(|p| clean_path(p)).collect(),
            allow_symlinks: policy.allow_symlinks,
            max_file_size: policy.max_file_size,
            audit: None,
        }
    }

    /// Report denials to an audit log.
    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Check a read access; returns the normalized absolute path.
    pub fn check_read(&self, path: &Path) -> Result<PathBuf, GuardError> {
        self.check(path, "read")
    }

    /// Check a write access; returns the normalized absolute path.
    pub fn check_write(&self, path: &Path) -> Result<PathBuf, GuardError> {
        self.check(path, "write")
    }

    fn check(&self, path: &Path, operation: &str) -> Result<PathBuf, GuardError> {
        let result = self.check_inner(path);
        if let Err(denial) = &result {
            tracing::warn!(operation, error = %denial, "file access denied");
            if let Some(audit) = &self.audit {
                audit.record(AuditEvent::denied(
                    denial.event_name(),
                    denial.path(),
                    operation,
                ));
            }
        }
        result
    }

    fn check_inner(&self, path: &Path) -> Result<PathBuf, GuardError> {
        let path = clean_path(&absolutize(path));

        if self.blocked.iter().any(|prefix| path.starts_with(prefix)) {
            return Err(GuardError::Blocked(path));
        }
        if !self.allowed.is_empty() && !self.allowed.iter().any(|prefix| path.starts_with(prefix))
        {
            return Err(GuardError::AccessDenied(path));
        }
        if !self.allow_symlinks {
            if let Ok(metadata) = std::fs::symlink_metadata(&path) {
                if metadata.file_type().is_symlink() {
                    return Err(GuardError::SymlinkDenied(path));
                }
            }
        }
        if self.max_file_size > 0 {
            if let Ok(metadata) = std::fs::metadata(&path) {
                if metadata.is_file() && metadata.len() > self.max_file_size {
                    return Err(GuardError::FileTooLarge {
                        size: metadata.len(),
                        max: self.max_file_size,
                        path,
                    });
                }
            }
        }
        Ok(path)
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Lexical normalization: fold `.` and `..` without touching the
/// filesystem, so symlinks stay visible to the symlink rule.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
