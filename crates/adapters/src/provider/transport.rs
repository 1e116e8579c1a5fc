// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the chat-completions endpoint.

use super::wire::ChatRequest;
use super::ProviderError;
use async_trait::async_trait;
use std::time::Duration;

/// Default transport-level timeout for one request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A raw provider response before status mapping.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends one chat request and returns the raw status + body.
///
/// Network and transport failures map to `ServerError`; status mapping
/// is the client's job.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<RawResponse, ProviderError>;
}

/// reqwest-backed transport with a bearer token.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::ServerError(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<RawResponse, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::ServerError(format!("request failed: {}", e)))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::ServerError(format!("read body: {}", e)))?
            .to_vec();
        Ok(RawResponse { status, body })
    }
}
