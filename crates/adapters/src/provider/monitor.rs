// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider request metrics.

use skylark_core::ErrorKind;
use std::ops::AddAssign;
use std::time::Duration;

/// Token counts for one request (or a summed tool loop).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt: u32,
    pub completion: u32,
    pub total: u32,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt += rhs.prompt;
        self.completion += rhs.completion;
        self.total += rhs.total;
    }
}

/// Receives per-request metrics from the provider client.
pub trait Monitor: Send + Sync {
    fn record_request(&self, model: &str, usage: TokenUsage, latency: Duration);

    fn record_error(&self, model: &str, kind: ErrorKind);
}

/// Discards all metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl Monitor for NoopMonitor {
    fn record_request(&self, _model: &str, _usage: TokenUsage, _latency: Duration) {}

    fn record_error(&self, _model: &str, _kind: ErrorKind) {}
}

/// Recording monitor for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct RecordingMonitor {
    inner: parking_lot::Mutex<Recorded>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct Recorded {
    requests: Vec<(String, TokenUsage, Duration)>,
    errors: Vec<(String, ErrorKind)>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingMonitor {
    pub fn new() -> Self {
        Self {
            inner: parking_lot::Mutex::new(Recorded::default()),
        }
    }

    pub fn requests(&self) -> Vec<(String, TokenUsage, Duration)> {
        self.inner.lock().requests.clone()
    }

    pub fn errors(&self) -> Vec<(String, ErrorKind)> {
        self.inner.lock().errors.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for RecordingMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Monitor for RecordingMonitor {
    fn record_request(&self, model: &str, usage: TokenUsage, latency: Duration) {
        self.inner.lock().requests.push((model.to_string(), usage, latency));
    }

    fn record_error(&self, model: &str, kind: ErrorKind) {
        self.inner.lock().errors.push((model.to_string(), kind));
    }
}
