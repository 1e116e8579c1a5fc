// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Markdown file watching.
//!
//! OS change notifications are filtered (extension, `.skai` trees,
//! unchanged content) and debounced per absolute path; each fire sends a
//! [`FileChangeJob`] into the bounded job sink. A blocked sink blocks
//! the fire task with it — backpressure is intentional.

use crate::debounce::Debouncer;
use crate::processor::{FileChangeJob, Processor};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use skylark_core::{Clock, Job};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch setup failed: {0}")]
    Notify(String),
}

/// Watcher tuning.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub roots: Vec<PathBuf>,
    /// Extensions (with dot) that produce jobs.
    pub extensions: Vec<String>,
    pub debounce_delay: Duration,
    pub max_delay: Duration,
    /// FileState cache entries kept before LRU eviction.
    pub state_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            extensions: vec![".md".to_string()],
            debounce_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(2),
            state_capacity: 1024,
        }
    }
}

/// Last-seen content state per watched file, LRU-evicted at capacity.
struct FileState {
    content_hash: [u8; 32],
    modified: SystemTime,
    checked: Instant,
}

struct FileStateCache {
    capacity: usize,
    entries: HashMap<PathBuf, FileState>,
}

impl FileStateCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    /// Record the observed state; returns false when the content hash is
    /// unchanged from the last observation.
    fn observe(
        &mut self,
        path: &Path,
        hash: [u8; 32],
        modified: SystemTime,
        now: Instant,
    ) -> bool {
        if let Some(state) = self.entries.get_mut(path) {
            state.checked = now;
            state.modified = modified;
            if state.content_hash == hash {
                tracing::trace!(
                    path = %path.display(),
                    modified = ?state.modified,
                    "content unchanged"
                );
                return false;
            }
            state.content_hash = hash;
            return true;
        }
        if self.entries.len() >= self.capacity {
            // Evict the least recently checked entry.
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, s)| s.checked)
                .map(|(p, _)| p.clone())
            {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            path.to_path_buf(),
            FileState {
                content_hash: hash,
                modified,
                checked: now,
            },
        );
        true
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Last recorded mtime for a tracked file.
    #[cfg(test)]
    fn last_modified(&self, path: &Path) -> Option<SystemTime> {
        self.entries.get(path).map(|s| s.modified)
    }
}

/// Watches roots for Markdown edits and feeds the job queue.
pub struct FileWatcher<C: Clock> {
    debouncer: Arc<Debouncer<C>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clock> FileWatcher<C> {
    /// Subscribe to OS notifications on every root and start the filter
    /// loop. Jobs flow into `job_tx`.
    pub fn start(
        config: WatcherConfig,
        clock: C,
        processor: Arc<Processor<C>>,
        job_tx: mpsc::Sender<Arc<dyn Job>>,
    ) -> Result<Self, WatchError> {
        let (event_tx, event_rx) = mpsc::channel::<PathBuf>(256);
        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        for path in event.paths {
                            let _ = event_tx.blocking_send(path);
                        }
                    }
                    // OS error stream is logged; watching continues.
                    Err(e) => tracing::warn!(error = %e, "file watcher error"),
                }
            })
            .map_err(|e| WatchError::Notify(e.to_string()))?;

        for root in &config.roots {
            let root = root
                .canonicalize()
                .unwrap_or_else(|_| root.to_path_buf());
            watcher
                .watch(&root, RecursiveMode::Recursive)
                .map_err(|e| WatchError::Notify(format!("{}: {}", root.display(), e)))?;
            tracing::info!(root = %root.display(), "watching");
        }

        let debouncer = Arc::new(Debouncer::new(
            clock.clone(),
            config.debounce_delay,
            config.max_delay,
        ));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let event_loop = tokio::spawn(event_loop(
            watcher,
            config,
            clock,
            event_rx,
            shutdown_rx,
            Arc::clone(&debouncer),
            processor,
            job_tx,
        ));

        Ok(Self {
            debouncer,
            shutdown: Mutex::new(Some(shutdown_tx)),
            event_loop: Mutex::new(Some(event_loop)),
        })
    }

    /// Stop watching: close the OS handle, drain the loop, stop the
    /// debouncer. Idempotent.
    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }
        let handle = self.event_loop.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.debouncer.stop();
    }
}

#[allow(clippy::too_many_arguments)]
async fn event_loop<C: Clock>(
    watcher: RecommendedWatcher,
    config: WatcherConfig,
    clock: C,
    mut event_rx: mpsc::Receiver<PathBuf>,
    mut shutdown_rx: oneshot::Receiver<()>,
    debouncer: Arc<Debouncer<C>>,
    processor: Arc<Processor<C>>,
    job_tx: mpsc::Sender<Arc<dyn Job>>,
) {
    // The notify handle must live as long as the loop.
    let _watcher = watcher;
    let mut states = FileStateCache::new(config.state_capacity);

    loop {
        let path = tokio::select! {
            path = event_rx.recv() => match path {
                Some(path) => path,
                None => break,
            },
            _ = &mut shutdown_rx => break,
        };
        if !accept(&config, &mut states, &clock, &path) {
            continue;
        }
        tracing::debug!(path = %path.display(), "change accepted");
        let key = path.to_string_lossy().into_owned();
        let job: Arc<dyn Job> = Arc::new(FileChangeJob::new(path, Arc::clone(&processor)));
        let tx = job_tx.clone();
        debouncer.debounce(
            key,
            Box::pin(async move {
                // Backpressure: a full queue blocks this fire.
                let _ = tx.send(job).await;
            }),
        );
    }
    debouncer.stop();
    tracing::debug!(tracked = states.len(), "watch loop drained");
}

/// Extension, `.skai`, and unchanged-content filters.
fn accept<C: Clock>(
    config: &WatcherConfig,
    states: &mut FileStateCache,
    clock: &C,
    path: &Path,
) -> bool {
    let matches_ext = config.extensions.iter().any(|ext| {
        path.file_name()
            .map(|name| name.to_string_lossy().ends_with(ext.as_str()))
            .unwrap_or(false)
    });
    if !matches_ext {
        return false;
    }
    if path
        .components()
        .any(|c| c.as_os_str().to_string_lossy() == skylark_config::SKAI_DIR)
    {
        return false;
    }
    // Removed or unreadable files produce no job.
    let Ok(content) = std::fs::read(path) else {
        return false;
    };
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let hash: [u8; 32] = Sha256::digest(&content).into();
    states.observe(path, hash, modified, clock.now())
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
