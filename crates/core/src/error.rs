// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy.
//!
//! Components keep their own `thiserror` enums; this kind classification
//! is the cross-crate vocabulary used for provider error mapping, worker
//! outcome classification, and CLI exit reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed user data: bad JSON, missing required field, unknown tool.
    InvalidInput,
    /// Missing or rejected provider credentials.
    Authentication,
    /// Upstream or local token bucket exhausted.
    RateLimit,
    /// Upstream 5xx, decode failure, network failure.
    ServerError,
    /// Missing process, key, or config path.
    NotFound,
    /// CPU, memory, or file-size ceiling hit.
    ResourceLimit,
    /// Security guard rejection.
    AccessDenied,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit => "rate limit",
            ErrorKind::ServerError => "server error",
            ErrorKind::NotFound => "not found",
            ErrorKind::ResourceLimit => "resource limit",
            ErrorKind::AccessDenied => "access denied",
        };
        write!(f, "{}", s)
    }
}
