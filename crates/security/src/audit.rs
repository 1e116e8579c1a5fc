// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only security audit log.
//!
//! Events are buffered in memory and written as JSON lines; a flush
//! happens once the buffer reaches 100 entries or 5 seconds have passed
//! since the last one (checked on record; call [`AuditLog::flush`] at
//! shutdown). Rotation renames the live file with a timestamp suffix
//! and opens a fresh one. Files are 0600 inside a 0700 directory.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Flush once this many entries are buffered.
const FLUSH_MAX_ENTRIES: usize = 100;

/// Flush at least this often (checked on record).
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub detail: String,
}

impl AuditEvent {
    pub fn new(event: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            event: event.into(),
            path: None,
            detail: detail.into(),
        }
    }

    /// A guard denial record.
    pub fn denied(event: &str, path: &Path, operation: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            event: event.to_string(),
            path: Some(path.to_string_lossy().into_owned()),
            detail: operation.to_string(),
        }
    }
}

struct AuditInner {
    file: File,
    buffer: Vec<String>,
    last_flush: Instant,
}

/// Buffered JSON-lines audit log.
pub struct AuditLog {
    path: PathBuf,
    inner: Mutex<AuditInner>,
}

impl AuditLog {
    /// Open (or create) the log at `path`.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            set_mode(parent, 0o700);
        }
        let file = open_append(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(AuditInner {
                file,
                buffer: Vec::new(),
                last_flush: Instant::now(),
            }),
        })
    }

    /// Buffer one event, flushing if the buffer or interval bound is hit.
    pub fn record(&self, event: AuditEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "audit event serialization failed");
                return;
            }
        };
        let mut inner = self.inner.lock();
        inner.buffer.push(line);
        if inner.buffer.len() >= FLUSH_MAX_ENTRIES || inner.last_flush.elapsed() >= FLUSH_INTERVAL
        {
            if let Err(e) = flush_inner(&mut inner) {
                tracing::warn!(error = %e, "audit flush failed");
            }
        }
    }

    /// Whether a timed flush is due.
    pub fn needs_flush(&self) -> bool {
        let inner = self.inner.lock();
        !inner.buffer.is_empty()
            && (inner.buffer.len() >= FLUSH_MAX_ENTRIES
                || inner.last_flush.elapsed() >= FLUSH_INTERVAL)
    }

    /// Write all buffered entries to disk.
    pub fn flush(&self) -> Result<(), AuditError> {
        let mut inner = self.inner.lock();
        flush_inner(&mut inner).map_err(|source| AuditError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Rotate: flush, rename the live file with a timestamp suffix, and
    /// open a fresh one.
    pub fn rotate(&self) -> Result<PathBuf, AuditError> {
        let mut inner = self.inner.lock();
        flush_inner(&mut inner).map_err(|source| AuditError::Io {
            path: self.path.clone(),
            source,
        })?;
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let rotated = self.path.with_file_name(format!(
            "{}.{}",
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audit.log".to_string()),
            stamp
        ));
        std::fs::rename(&self.path, &rotated).map_err(|source| AuditError::Io {
            path: self.path.clone(),
            source,
        })?;
        inner.file = open_append(&self.path)?;
        inner.last_flush = Instant::now();
        tracing::info!(rotated = %rotated.display(), "audit log rotated");
        Ok(rotated)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        let _ = flush_inner(&mut inner);
    }
}

fn flush_inner(inner: &mut AuditInner) -> Result<(), std::io::Error> {
    if inner.buffer.is_empty() {
        inner.last_flush = Instant::now();
        return Ok(());
    }
    let mut chunk = String::new();
    for line in inner.buffer.drain(..) {
        chunk.push_str(&line);
        chunk.push('\n');
    }
    inner.file.write_all(chunk.as_bytes())?;
    inner.file.flush()?;
    inner.last_flush = Instant::now();
    Ok(())
}

fn open_append(path: &Path) -> Result<File, AuditError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AuditError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    set_mode(path, 0o600);
    Ok(file)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
