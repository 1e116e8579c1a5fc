// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot-recompilation of tools when their source changes.

use super::{ToolError, ToolManager};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use skylark_core::Clock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Watches the tools directory and recompiles a tool when a source file
/// with the manager's extension changes.
pub struct ToolWatcher {
    shutdown: Option<oneshot::Sender<()>>,
}

impl ToolWatcher {
    pub fn start<C: Clock>(manager: Arc<ToolManager<C>>) -> Result<Self, ToolError> {
        let (tx, mut rx) = mpsc::channel::<PathBuf>(32);
        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        for path in event.paths {
                            let _ = tx.blocking_send(path);
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "tool watcher error"),
                }
            })
            .map_err(|e| ToolError::Watch(e.to_string()))?;
        watcher
            .watch(manager.tools_dir(), RecursiveMode::Recursive)
            .map_err(|e| ToolError::Watch(e.to_string()))?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            // The notify handle must stay alive for the loop's lifetime.
            let _watcher = watcher;
            loop {
                tokio::select! {
                    path = rx.recv() => match path {
                        Some(path) => handle_change(&manager, &path).await,
                        None => break,
                    },
                    _ = &mut shutdown_rx => break,
                }
            }
            tracing::debug!("tool watcher stopped");
        });

        Ok(Self {
            shutdown: Some(shutdown_tx),
        })
    }

    /// Stop watching. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ToolWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_change<C: Clock>(manager: &Arc<ToolManager<C>>, path: &Path) {
    let matches_ext = path
        .extension()
        .map(|ext| ext.to_string_lossy() == manager.source_ext())
        .unwrap_or(false);
    if !matches_ext {
        return;
    }
    let Some(name) = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
    else {
        return;
    };
    tracing::info!(tool = %name, changed = %path.display(), "tool source changed, recompiling");
    manager.invalidate(&name);
    if let Err(e) = manager.compile(&name).await {
        tracing::warn!(tool = %name, error = %e, "recompile failed");
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
