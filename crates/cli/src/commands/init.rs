// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skylark init [name]` - scaffold a project.

use crate::logging;
use anyhow::{Context, Result};
use clap::Args;
use skylark_config::SKAI_DIR;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r#"# Skylark project configuration.
# Every key is optional; the values below are the defaults.

workers:
  count: 4
  queue_size: 100

file_watch:
  debounce_delay: 300ms
  max_delay: 2s
  extensions: [".md"]

watch_paths: ["."]

# Configure at least one model to answer commands:
# models:
#   openai:
#     gpt-4o:
#       api_key: ""
#       temperature: 0.7
#       max_tokens: 2048

# tools:
#   currentdatetime:
#     env: {}

security:
  file_permissions:
    allowed_paths: []
    blocked_paths: []
    allow_symlinks: false
    max_file_size: 10485760
  audit_log:
    enabled: false
"#;

const DEFAULT_PROMPT: &str = "You are a helpful assistant embedded in a Markdown document.\n\
Answer the command using the document context supplied before it.\n";

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory)
    pub name: Option<String>,
}

pub fn execute(args: InitArgs) -> Result<()> {
    logging::init();
    let root = match &args.name {
        Some(name) => PathBuf::from(name),
        None => std::env::current_dir().context("resolving current directory")?,
    };
    scaffold(&root)?;
    println!("Initialized Skylark project at {}", root.display());
    println!("Next: add a model under `models:` in {}/config.yaml", SKAI_DIR);
    Ok(())
}

fn scaffold(root: &Path) -> Result<()> {
    let skai = root.join(SKAI_DIR);
    for dir in [
        skai.clone(),
        skai.join("assistants/assistant"),
        skai.join("tools"),
        skai.join("logs"),
    ] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    write_if_absent(&skai.join("config.yaml"), DEFAULT_CONFIG)?;
    write_if_absent(
        &skai.join("assistants/assistant/prompt.md"),
        DEFAULT_PROMPT,
    )?;
    Ok(())
}

/// Existing files are preserved so `init` is safe to re-run.
fn write_if_absent(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "already exists, skipping");
        return Ok(());
    }
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
