// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unit of work consumed by the worker pool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a job instance, carried through logs and
/// retry bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A prefix of at most `len` characters, for compact log fields.
    /// Respects character boundaries.
    pub fn short(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Errors surfaced by a job body.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    #[error("read failed: {0}")]
    Read(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("processing failed: {0}")]
    Process(String),
    #[error("{0}")]
    Other(String),
}

impl JobError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// A unit of work.
///
/// A worker owns the job from dequeue to terminal state: `run` executes
/// the whole body, `on_failure` is invoked when the job terminally fails
/// (including resource-limit kills), and `max_retries` bounds how many
/// times the pool re-runs a failing job before counting it failed.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self) -> Result<(), JobError>;

    fn on_failure(&self, error: &JobError);

    fn max_retries(&self) -> u32 {
        0
    }

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

impl fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({})", self.describe())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
