// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skylark run` - process every watched file once and exit.
//!
//! Exits non-zero when any file job fails.

use crate::{logging, stack};
use anyhow::{bail, Context, Result};
use clap::Args;
use skylark_config::{Project, SKAI_DIR};
use skylark_core::Job;
use skylark_engine::FileChangeJob;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args)]
pub struct RunArgs {}

pub async fn execute(_args: RunArgs) -> Result<()> {
    logging::init();
    let cwd = std::env::current_dir()?;
    let project = Project::discover(&cwd)
        .context("no project found; run `skylark init` first")?;

    let stack = stack::build(&project).await?;
    let extensions = project.config().file_watch.extensions.clone();

    let mut files = Vec::new();
    for root in project.watch_paths() {
        collect_files(&root, &extensions, &mut files);
    }
    files.sort();
    files.dedup();
    tracing::info!(count = files.len(), "processing files");

    let total = files.len() as u64;
    for path in files {
        let job: Arc<dyn Job> =
            Arc::new(FileChangeJob::new(path, Arc::clone(&stack.processor)));
        stack
            .job_tx
            .send(job)
            .await
            .map_err(|_| anyhow::anyhow!("worker pool rejected job"))?;
    }

    // Wait for every job to reach a terminal state.
    loop {
        let stats = stack.pool.stats();
        if stats.processed + stats.failed >= total && stats.queued == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    stack.pool.stop().await;
    if let Some(audit) = &stack.audit {
        let _ = audit.flush();
    }

    let stats = stack.pool.stats();
    println!(
        "processed {} file(s), {} failed",
        stats.processed, stats.failed
    );
    if stats.failed > 0 {
        bail!("{} file(s) failed", stats.failed);
    }
    Ok(())
}

/// Recursively gather files with a watched extension, skipping `.skai`
/// trees and hidden directories.
fn collect_files(root: &Path, extensions: &[String], out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "cannot walk directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if name == SKAI_DIR || name.starts_with('.') {
                continue;
            }
            collect_files(&path, extensions, out);
        } else if extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            out.push(path);
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
