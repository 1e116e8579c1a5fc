// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limited LLM provider client.
//!
//! The client speaks the chat-completions wire protocol through a
//! [`ChatTransport`] (real HTTP or a scripted fake), holds the dual
//! token-bucket [`RateLimiter`], and iterates the tool-call loop until
//! the model returns plain content.

mod client;
mod monitor;
mod rate_limit;
mod transport;
pub mod wire;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTransport;
#[cfg(any(test, feature = "test-support"))]
pub use monitor::RecordingMonitor;

pub use client::{ChatOutcome, ProviderClient, ProviderSettings, RegisteredTool, ToolExecutor};
pub use monitor::{Monitor, NoopMonitor, TokenUsage};
pub use rate_limit::RateLimiter;
pub use transport::{ChatTransport, HttpTransport, RawResponse};

use skylark_core::ErrorKind;
use thiserror::Error;

/// Errors from the provider client and rate limiter.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("rate limit: {0}")]
    RateLimit(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("authentication: {0}")]
    Authentication(String),
    #[error("server error: {0}")]
    ServerError(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("tool {name} failed: {message}")]
    ToolFailed { name: String, message: String },
    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Classification in the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::RateLimit(_) => ErrorKind::RateLimit,
            ProviderError::InvalidInput(_) | ProviderError::UnknownTool(_) => {
                ErrorKind::InvalidInput
            }
            ProviderError::Authentication(_) => ErrorKind::Authentication,
            ProviderError::ServerError(_)
            | ProviderError::ToolFailed { .. }
            | ProviderError::Cancelled => ErrorKind::ServerError,
        }
    }
}
