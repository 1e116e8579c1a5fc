// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in tools shipped inside the binary.
//!
//! Sources are embedded at compile time and materialized into the
//! project's tools directory by `init_builtins`, then compiled like any
//! user tool.

/// (name, source) pairs for every embedded tool.
pub const BUILTIN_TOOLS: &[(&str, &str)] = &[("currentdatetime", CURRENTDATETIME_SRC)];

const CURRENTDATETIME_SRC: &str = include_str!("currentdatetime.go");

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
