// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded job queue and worker pool.
//!
//! Jobs enter through producer handles returned by [`WorkerPool::queue`];
//! a wrapper task per producer counts each accepted job into the `queued`
//! gauge before forwarding it into the bounded internal queue, so the
//! gauge is exact regardless of producer behavior. Workers own a job from
//! dequeue to terminal state and run it inside a per-job process envelope
//! (`worker-<id>`) that carries the pool's resource limits.

use parking_lot::Mutex;
use skylark_adapters::{ProcessManager, Signal};
use skylark_core::{
    CancelToken, Clock, IdGen, Job, JobError, JobId, PoolStats, ResourceLimits, StatsSnapshot,
    UuidIdGen,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Worker pool sizing and per-job envelope.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_size: usize,
    /// Limits applied to each job's companion process.
    pub limits: ResourceLimits,
    /// Command for the per-job companion process; it idles while the job
    /// runs and exists to carry the resource envelope.
    pub companion_argv: Vec<String>,
    /// First retry backoff; doubles per attempt.
    pub retry_base: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_size: 100,
            limits: ResourceLimits::default(),
            companion_argv: vec!["sleep".to_string(), "2147483647".to_string()],
            retry_base: Duration::from_millis(500),
        }
    }
}

struct QueuedJob {
    id: JobId,
    job: Arc<dyn Job>,
    attempt: u32,
}

/// Shared bits every worker needs.
struct PoolShared<C: Clock> {
    stats: Arc<PoolStats>,
    manager: Arc<ProcessManager<C>>,
    clock: C,
    config: PoolConfig,
    done: CancelToken,
    /// Sender used by retry re-enqueues; workers hold it weakly via clone.
    retry_tx: mpsc::Sender<QueuedJob>,
}

/// Fixed-size pool of workers over one bounded queue.
pub struct WorkerPool<C: Clock> {
    shared: Arc<PoolShared<C>>,
    job_tx: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    producers: Mutex<Vec<JoinHandle<()>>>,
    retries: Arc<Mutex<Vec<JoinHandle<()>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    job_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
    stopped: Mutex<bool>,
}

impl<C: Clock> WorkerPool<C> {
    pub fn new(config: PoolConfig, manager: Arc<ProcessManager<C>>, clock: C) -> Arc<Self> {
        let workers = config.workers.max(1);
        let (job_tx, job_rx) = mpsc::channel::<QueuedJob>(config.queue_size.max(1));
        let shared = Arc::new(PoolShared {
            stats: Arc::new(PoolStats::new()),
            manager,
            clock,
            config,
            done: CancelToken::new(),
            retry_tx: job_tx.clone(),
        });

        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));
        let retries = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::with_capacity(workers);
        for id in 1..=workers {
            handles.push(tokio::spawn(worker_loop(
                id,
                Arc::clone(&shared),
                Arc::clone(&job_rx),
                Arc::clone(&retries),
            )));
        }

        Arc::new(Self {
            shared,
            job_tx: Mutex::new(Some(job_tx)),
            producers: Mutex::new(Vec::new()),
            retries,
            workers: Mutex::new(handles),
            job_rx,
            stopped: Mutex::new(false),
        })
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// A producer handle. Jobs written to it are counted into `queued`
    /// and forwarded into the internal bounded queue; the forwarder
    /// aborts on shutdown.
    pub fn queue(&self) -> mpsc::Sender<Arc<dyn Job>> {
        let (tx, mut rx) = mpsc::channel::<Arc<dyn Job>>(1);
        let Some(internal) = self.job_tx.lock().clone() else {
            // Pool already stopped; jobs written to the handle are dropped
            // when the receiver goes away.
            return tx;
        };
        let stats = Arc::clone(&self.shared.stats);
        let done = self.shared.done.clone();
        let ids = UuidIdGen;
        let handle = tokio::spawn(async move {
            loop {
                let job = tokio::select! {
                    job = rx.recv() => job,
                    _ = done.cancelled() => break,
                };
                let Some(job) = job else { break };
                let id = ids.next();
                tracing::debug!(job_id = id.short(8), job = %job.describe(), "job accepted");
                stats.job_queued();
                tokio::select! {
                    sent = internal.send(QueuedJob { id, job, attempt: 0 }) => {
                        if sent.is_err() {
                            stats.job_done();
                            break;
                        }
                    }
                    _ = done.cancelled() => {
                        stats.job_done();
                        break;
                    }
                }
            }
        });
        self.producers.lock().push(handle);
        tx
    }

    /// True once every accepted job has reached a terminal state.
    pub fn drained(&self) -> bool {
        self.stats().queued == 0
    }

    /// Shut down: stop producers, close the queue, join the workers.
    /// In-flight jobs finish (bounded by their CPU budget); jobs still
    /// queued are failed with a pool-stopped error. Idempotent.
    pub async fn stop(&self) {
        {
            let mut stopped = self.stopped.lock();
            if *stopped {
                return;
            }
            *stopped = true;
        }
        self.shared.done.cancel();

        let producers: Vec<_> = std::mem::take(&mut *self.producers.lock());
        for handle in producers {
            let _ = handle.await;
        }
        // Closing the internal queue lets idle workers observe the end.
        self.job_tx.lock().take();
        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            let _ = handle.await;
        }
        // Workers are done, so the retry set is complete now.
        let retries: Vec<_> = std::mem::take(&mut *self.retries.lock());
        for handle in retries {
            let _ = handle.await;
        }
        // Anything left in the queue never ran.
        {
            let mut rx = self.job_rx.lock().await;
            while let Ok(q) = rx.try_recv() {
                let error = JobError::other("worker pool stopped");
                q.job.on_failure(&error);
                self.shared.stats.record_failed();
                self.shared.stats.job_done();
            }
        }
        tracing::info!(stats = ?self.stats(), "worker pool stopped");
    }
}

async fn worker_loop<C: Clock>(
    id: usize,
    shared: Arc<PoolShared<C>>,
    job_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
    retries: Arc<Mutex<Vec<JoinHandle<()>>>>,
) {
    loop {
        let queued = {
            let mut rx = job_rx.lock().await;
            tokio::select! {
                job = rx.recv() => job,
                _ = shared.done.cancelled() => None,
            }
        };
        let Some(queued) = queued else {
            tracing::debug!(worker = id, "worker exiting");
            return;
        };
        execute_job(id, &shared, queued, &retries).await;
    }
}

/// Run one job inside its process envelope and classify the outcome.
async fn execute_job<C: Clock>(
    worker_id: usize,
    shared: &Arc<PoolShared<C>>,
    queued: QueuedJob,
    retries: &Arc<Mutex<Vec<JoinHandle<()>>>>,
) {
    let QueuedJob { id, job, attempt } = queued;
    let describe = job.describe();
    tracing::debug!(worker = worker_id, job_id = id.short(8), job = %describe, attempt, "job started");

    let handle = shared.manager.new_handle(
        format!("worker-{}", worker_id),
        shared.config.companion_argv.clone(),
    );
    let _ = handle.set_limits(shared.config.limits);
    if let Err(e) = handle.start().await {
        let error = JobError::other(format!("worker process start failed: {}", e));
        terminal_failure(shared, &job, &error);
        return;
    }

    let run_result = job.run().await;

    // Stop whatever child work the job left behind, then reap.
    let _ = handle.signal(Signal::Interrupt);
    let wait_result = handle.wait().await;

    let failure = match run_result {
        Err(e) => Some(e),
        Ok(()) => match wait_result {
            Err(e) if is_resource_limit(&e.to_string()) => Some(JobError::other(e.to_string())),
            _ => None,
        },
    };

    match failure {
        None => {
            shared.stats.record_processed();
            shared.stats.job_done();
            tracing::debug!(worker = worker_id, job = %describe, "job processed");
        }
        Some(error) => {
            if attempt < job.max_retries() {
                schedule_retry(shared, id, job, attempt, retries);
            } else {
                tracing::warn!(worker = worker_id, job = %describe, error = %error, "job failed");
                terminal_failure(shared, &job, &error);
            }
        }
    }
}

fn terminal_failure<C: Clock>(shared: &Arc<PoolShared<C>>, job: &Arc<dyn Job>, error: &JobError) {
    job.on_failure(error);
    shared.stats.record_failed();
    shared.stats.job_done();
}

/// Re-enqueue after an exponential backoff; `queued` stays held for the
/// whole wait. Shutdown during the backoff fails the job instead.
fn schedule_retry<C: Clock>(
    shared: &Arc<PoolShared<C>>,
    id: JobId,
    job: Arc<dyn Job>,
    attempt: u32,
    retries: &Arc<Mutex<Vec<JoinHandle<()>>>>,
) {
    let backoff = shared.config.retry_base * 2u32.saturating_pow(attempt);
    tracing::debug!(job_id = id.short(8), attempt, backoff_ms = backoff.as_millis() as u64, "retrying");
    let shared = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        let dropped = tokio::select! {
            _ = shared.clock.sleep(backoff) => {
                let next = QueuedJob {
                    id: id.clone(),
                    job: Arc::clone(&job),
                    attempt: attempt + 1,
                };
                tokio::select! {
                    sent = shared.retry_tx.send(next) => sent.is_err(),
                    _ = shared.done.cancelled() => true,
                }
            }
            _ = shared.done.cancelled() => true,
        };
        if dropped {
            let error = JobError::other("worker pool stopped");
            job.on_failure(&error);
            shared.stats.record_failed();
            shared.stats.job_done();
        }
    });
    retries.lock().push(handle);
}

/// Worker-boundary classification of companion-wait errors.
fn is_resource_limit(message: &str) -> bool {
    message.contains("CPU time limit exceeded") || message.contains("out of memory")
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
