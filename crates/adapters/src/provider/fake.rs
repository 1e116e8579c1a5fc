// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted transport for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::transport::{ChatTransport, RawResponse};
use super::wire::ChatRequest;
use super::ProviderError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Fake transport that replays a script of responses and records every
/// request it is given.
#[derive(Default)]
pub struct FakeTransport {
    inner: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    script: VecDeque<Result<RawResponse, ProviderError>>,
    requests: Vec<ChatRequest>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response with the given JSON body.
    pub fn push_ok(&self, body: &str) {
        self.push_status(200, body);
    }

    /// Queue a response with an explicit status.
    pub fn push_status(&self, status: u16, body: &str) {
        self.inner.lock().script.push_back(Ok(RawResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
    }

    /// Queue a transport-level failure.
    pub fn push_error(&self, error: ProviderError) {
        self.inner.lock().script.push_back(Err(error));
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.inner.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner.lock().requests.len()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(&self, request: &ChatRequest) -> Result<RawResponse, ProviderError> {
        let mut state = self.inner.lock();
        state.requests.push(request.clone());
        state
            .script
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::ServerError("fake script exhausted".into())))
    }
}
