// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt context assembly.
//!
//! Before a command is sent to the provider, the processor asks a
//! [`ContextSource`] for surrounding document context. The shipped
//! implementation collects the Markdown heading chain enclosing the
//! command plus the command's own section.

use skylark_core::Command;

/// Produces the document context for one command.
pub trait ContextSource: Send + Sync {
    fn context_for(&self, content: &str, command: &Command) -> String;
}

/// Heading-chain extractor.
///
/// For a command on line N, emits every enclosing heading (outermost
/// first) followed by the lines of the command's section, clipped to a
/// byte budget. Other command lines and invalidated lines are omitted.
pub struct HeaderContext {
    max_bytes: usize,
}

impl Default for HeaderContext {
    fn default() -> Self {
        Self { max_bytes: 4096 }
    }
}

impl HeaderContext {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    // A heading needs a space after the hashes.
    trimmed[hashes..]
        .chars()
        .next()
        .filter(|c| c.is_whitespace())
        .map(|_| hashes)
}

fn is_command_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('!') || trimmed.starts_with("-!")
}

impl ContextSource for HeaderContext {
    fn context_for(&self, content: &str, command: &Command) -> String {
        let lines: Vec<&str> = content.lines().collect();
        let at = command.line.min(lines.len());

        // Walk upward collecting the enclosing heading chain.
        let mut chain: Vec<&str> = Vec::new();
        let mut level_bound = usize::MAX;
        let mut section_start = 0;
        for i in (0..at).rev() {
            if let Some(level) = heading_level(lines[i]) {
                if level < level_bound {
                    if chain.is_empty() {
                        section_start = i + 1;
                    }
                    chain.push(lines[i]);
                    level_bound = level;
                    if level == 1 {
                        break;
                    }
                }
            }
        }
        chain.reverse();

        let mut out = String::new();
        for heading in &chain {
            out.push_str(heading.trim_start());
            out.push('\n');
        }
        for line in lines.iter().take(at).skip(section_start) {
            if is_command_line(line) {
                continue;
            }
            out.push_str(line);
            out.push('\n');
        }

        if out.len() > self.max_bytes {
            // Keep the tail: the closest context wins.
            let cut = out.len() - self.max_bytes;
            let cut = out
                .char_indices()
                .map(|(i, _)| i)
                .find(|i| *i >= cut)
                .unwrap_or(0);
            out = out[cut..].to_string();
        }
        out.trim_end().to_string()
    }
}

/// Recording fake for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeContextSource {
    context: String,
    calls: parking_lot::Mutex<Vec<usize>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeContextSource {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Line numbers of every command this source was asked about.
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ContextSource for FakeContextSource {
    fn context_for(&self, _content: &str, command: &Command) -> String {
        self.calls.lock().push(command.line);
        self.context.clone()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
