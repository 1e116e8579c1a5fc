// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line invalidation and response insertion.
//!
//! For each processed command on line `L` the rewritten file carries:
//!
//! ```text
//! -L
//!
//! <response text>
//!
//! ```
//!
//! Non-command lines are preserved verbatim and the file always ends
//! with a newline.

use skylark_core::Response;
use std::collections::HashMap;

/// Apply responses to a document.
pub fn apply(content: &str, responses: &[Response]) -> String {
    let by_line: HashMap<usize, &Response> =
        responses.iter().map(|r| (r.command.line, r)).collect();

    let mut out = String::with_capacity(content.len() + responses.len() * 64);
    for (i, line) in content.lines().enumerate() {
        match by_line.get(&i) {
            Some(response) => {
                out.push('-');
                out.push_str(line);
                out.push_str("\n\n");
                out.push_str(response.text.trim_end());
                out.push_str("\n\n");
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
