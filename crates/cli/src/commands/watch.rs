// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skylark watch` - follow the project and answer commands as files
//! change. Runs until SIGINT/SIGTERM or an optional timeout.

use crate::{logging, stack};
use anyhow::{Context, Result};
use clap::Args;
use skylark_config::Project;
use skylark_core::parse_duration;
use skylark_engine::FileWatcher;
use tokio::signal::unix::{signal, SignalKind};

#[derive(Args)]
pub struct WatchArgs {
    /// Stop after this long (e.g. "30s", "5m"); mostly for scripting
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,
}

pub async fn execute(args: WatchArgs) -> Result<()> {
    let timeout = args
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid --timeout: {}", e))?;

    let cwd = std::env::current_dir()?;
    let project = Project::discover(&cwd)
        .context("no project found; run `skylark init` first")?;
    let _log_guard = logging::init_with_file(&project.logs_dir());
    tracing::info!(root = %project.root().display(), "watching project");

    let stack = stack::build(&project).await?;
    let watcher = FileWatcher::start(
        stack.watcher_config.clone(),
        skylark_core::SystemClock::new(),
        std::sync::Arc::clone(&stack.processor),
        stack.job_tx.clone(),
    )
    .map_err(|e| anyhow::anyhow!("starting watcher: {}", e))?;

    wait_for_shutdown(timeout).await?;
    tracing::info!("shutting down");

    stack.cancel.cancel();
    watcher.stop().await;
    stack.pool.stop().await;
    if let Some(mut tool_watcher) = stack.tool_watcher {
        tool_watcher.stop();
    }
    if let Some(audit) = &stack.audit {
        let _ = audit.flush();
    }

    let stats = stack.pool.stats();
    tracing::info!(
        processed = stats.processed,
        failed = stats.failed,
        "watch finished"
    );
    Ok(())
}

async fn wait_for_shutdown(timeout: Option<std::time::Duration>) -> Result<()> {
    let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let sleep = async {
        match timeout {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
        _ = term.recv() => tracing::info!("terminated"),
        _ = sleep => tracing::info!("timeout reached"),
    }
    Ok(())
}
