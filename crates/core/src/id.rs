// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job ID generation.
//!
//! The pool stamps every accepted job with a [`JobId`]; the generator
//! sits behind a seam so tests can use predictable IDs.

use crate::job::JobId;

/// Produces identifiers for accepted jobs.
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> JobId;
}

/// Random UUIDv4 IDs for production use.
#[derive(Clone, Copy, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> JobId {
        JobId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Counter-backed IDs (`job-1`, `job-2`, ...) for deterministic tests.
/// Clones share the counter.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct CountingIdGen {
    issued: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

#[cfg(any(test, feature = "test-support"))]
impl IdGen for CountingIdGen {
    fn next(&self) -> JobId {
        let n = self
            .issued
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        JobId::new(format!("job-{}", n + 1))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
