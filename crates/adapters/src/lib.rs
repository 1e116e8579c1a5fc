// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skylark-adapters: process, tool, and provider integrations.
//!
//! Everything that touches the outside world lives here: spawning child
//! processes under resource limits, compiling and executing user tools,
//! and talking to the LLM provider over HTTP. The engine depends only on
//! the traits and handles exported from this crate.

pub mod context;
pub mod process;
pub mod provider;
pub mod tool;

pub use context::{ContextSource, HeaderContext};
pub use process::{ProcessError, ProcessHandle, ProcessManager, Signal};
pub use provider::{
    ChatOutcome, ChatTransport, HttpTransport, Monitor, NoopMonitor, ProviderClient,
    ProviderError, ProviderSettings, RateLimiter, RegisteredTool, TokenUsage, ToolExecutor,
};
pub use tool::{Tool, ToolError, ToolManager, ToolSchema};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use context::FakeContextSource;
#[cfg(any(test, feature = "test-support"))]
pub use provider::{FakeTransport, RecordingMonitor};
