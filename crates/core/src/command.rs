// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Markdown command lines.
//!
//! A command is a line that, after leading whitespace, begins with `!`
//! followed by an assistant name: `!echo summarize this section`. A
//! processed command is "invalidated" by prefixing the line with `-`, and
//! `-!` lines are never parsed again.

use serde::{Deserialize, Serialize};

/// Characters permitted in an assistant name.
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// True when the name contains punctuation that makes its case
/// significant.
fn has_punctuation(name: &str) -> bool {
    name.contains(['.', '_', '-'])
}

/// Normalize a parsed assistant name: lowercased unless it contains
/// `.`, `_`, or `-`, in which case it is kept verbatim.
pub fn normalize_name(name: &str) -> String {
    if has_punctuation(name) {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// A command parsed from a Markdown line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// The verbatim source line, including leading whitespace.
    pub original: String,
    /// Normalized assistant name (see [`normalize_name`]).
    pub assistant_name: String,
    /// Prompt text following the name, trimmed.
    pub text: String,
    /// Zero-based line index within the file.
    pub line: usize,
}

impl Command {
    /// Parse a single line. Returns `None` for non-command lines and for
    /// invalidated (`-!`) lines.
    pub fn parse_line(line: &str, index: usize) -> Option<Self> {
        let trimmed = line.trim_start();
        if trimmed.starts_with("-!") {
            return None;
        }
        let rest = trimmed.strip_prefix('!')?;
        let first = rest.chars().next()?;
        if first.is_whitespace() {
            return None;
        }
        let name_len = rest
            .char_indices()
            .find(|(_, c)| !is_name_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if name_len == 0 {
            return None;
        }
        let assistant_name = normalize_name(&rest[..name_len]);
        let text = rest[name_len..].trim().to_string();
        Some(Self {
            original: line.to_string(),
            assistant_name,
            text,
            line: index,
        })
    }

    /// Parse every command line in a document.
    pub fn parse_all(content: &str) -> Vec<Self> {
        content
            .lines()
            .enumerate()
            .filter_map(|(i, line)| Self::parse_line(line, i))
            .collect()
    }

    /// Whether this command addresses the given configured assistant.
    ///
    /// Punctuation-free names compare case-insensitively; names carrying
    /// `.`, `_`, or `-` compare exactly.
    pub fn addresses(&self, configured: &str) -> bool {
        if has_punctuation(&self.assistant_name) || has_punctuation(configured) {
            self.assistant_name == configured
        } else {
            self.assistant_name.eq_ignore_ascii_case(configured)
        }
    }
}

/// An assistant's answer to a single command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub command: Command,
    pub text: String,
}

impl Response {
    pub fn new(command: Command, text: impl Into<String>) -> Self {
        Self {
            command,
            text: text.into(),
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
