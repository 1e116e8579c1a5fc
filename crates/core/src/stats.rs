// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-pool counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Shared counters maintained by the worker pool.
///
/// `processed` and `failed` are monotonic; `queued` is a gauge covering
/// jobs accepted but not yet completed. Counters are read independently,
/// so a snapshot is advisory rather than a linearizable view.
#[derive(Debug, Default)]
pub struct PoolStats {
    processed: AtomicU64,
    failed: AtomicU64,
    queued: AtomicI64,
}

/// Point-in-time copy of the pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub failed: u64,
    pub queued: i64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_done(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
