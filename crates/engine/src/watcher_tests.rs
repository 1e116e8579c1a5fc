// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::processor::ProcessorDeps;
use skylark_adapters::provider::ProviderSettings;
use skylark_adapters::{FakeContextSource, FakeTransport, NoopMonitor, ProviderClient};
use skylark_config::AssistantSet;
use skylark_core::{CancelToken, SystemClock};

fn test_processor() -> Arc<Processor<SystemClock>> {
    let provider = Arc::new(ProviderClient::new(
        Arc::new(FakeTransport::new()) as Arc<dyn skylark_adapters::ChatTransport>,
        SystemClock::new(),
        ProviderSettings::default(),
        Arc::new(NoopMonitor),
    ));
    Arc::new(Processor::new(ProcessorDeps {
        provider,
        assistants: AssistantSet::default(),
        context: Arc::new(FakeContextSource::new("")),
        guard: None,
        cancel: CancelToken::new(),
    }))
}

struct Fixture {
    watcher: FileWatcher<SystemClock>,
    jobs: mpsc::Receiver<Arc<dyn Job>>,
    root: tempfile::TempDir,
}

fn start_watcher() -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let (job_tx, jobs) = mpsc::channel(8);
    let config = WatcherConfig {
        roots: vec![root.path().to_path_buf()],
        debounce_delay: Duration::from_millis(50),
        max_delay: Duration::from_secs(1),
        ..WatcherConfig::default()
    };
    let watcher = FileWatcher::start(config, SystemClock::new(), test_processor(), job_tx).unwrap();
    Fixture {
        watcher,
        jobs,
        root,
    }
}

async fn expect_job(jobs: &mut mpsc::Receiver<Arc<dyn Job>>) -> Arc<dyn Job> {
    tokio::time::timeout(Duration::from_secs(5), jobs.recv())
        .await
        .expect("no job within 5s")
        .expect("job channel closed")
}

async fn expect_quiet(jobs: &mut mpsc::Receiver<Arc<dyn Job>>, for_ms: u64) {
    let outcome = tokio::time::timeout(Duration::from_millis(for_ms), jobs.recv()).await;
    assert!(outcome.is_err(), "unexpected job: {:?}", outcome.ok().flatten());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edit_burst_produces_one_job() {
    let mut fx = start_watcher();
    let path = fx.root.path().join("a.md");

    std::fs::write(&path, "# T\n!echo one\n").unwrap();
    std::fs::write(&path, "# T\n!echo two\n").unwrap();
    std::fs::write(&path, "# T\n!echo hi\n").unwrap();

    let job = expect_job(&mut fx.jobs).await;
    assert!(job.describe().contains("a.md"));
    expect_quiet(&mut fx.jobs, 300).await;
    fx.watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_markdown_is_ignored() {
    let mut fx = start_watcher();
    std::fs::write(fx.root.path().join("b.txt"), "not markdown").unwrap();
    expect_quiet(&mut fx.jobs, 500).await;
    fx.watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn skai_tree_is_ignored() {
    let mut fx = start_watcher();
    let skai = fx.root.path().join(".skai/assistants/echo");
    std::fs::create_dir_all(&skai).unwrap();
    std::fs::write(skai.join("prompt.md"), "You echo.").unwrap();
    expect_quiet(&mut fx.jobs, 500).await;
    fx.watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unchanged_content_is_dropped() {
    let mut fx = start_watcher();
    let path = fx.root.path().join("a.md");

    std::fs::write(&path, "stable content\n").unwrap();
    let _ = expect_job(&mut fx.jobs).await;

    // Rewrite with identical bytes: the content hash filter drops it.
    std::fs::write(&path, "stable content\n").unwrap();
    expect_quiet(&mut fx.jobs, 400).await;

    // A real change flows through again.
    std::fs::write(&path, "new content\n").unwrap();
    let _ = expect_job(&mut fx.jobs).await;
    fx.watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_is_idempotent() {
    let fx = start_watcher();
    fx.watcher.stop().await;
    fx.watcher.stop().await;
}

#[test]
fn file_state_cache_detects_changes_and_evicts() {
    let mut cache = FileStateCache::new(2);
    let now = Instant::now();
    let t0 = SystemTime::UNIX_EPOCH;

    let a = PathBuf::from("/a.md");
    let b = PathBuf::from("/b.md");
    let c = PathBuf::from("/c.md");

    assert!(cache.observe(&a, [1; 32], t0, now));
    let t1 = t0 + Duration::from_secs(60);
    assert!(!cache.observe(&a, [1; 32], t1, now + Duration::from_secs(1)));
    // Same content with a newer mtime is still "unchanged", but the
    // stamp is updated.
    assert_eq!(cache.last_modified(&a), Some(t1));
    assert!(cache.observe(&a, [2; 32], t1, now + Duration::from_secs(2)));

    assert!(cache.observe(&b, [1; 32], t0, now + Duration::from_secs(3)));
    assert_eq!(cache.len(), 2);

    // Capacity 2: inserting c evicts the least recently checked (a).
    assert!(cache.observe(&c, [1; 32], t0, now + Duration::from_secs(4)));
    assert_eq!(cache.len(), 2);
    // a was evicted, so the same hash counts as a change again.
    assert!(cache.observe(&a, [2; 32], t0, now + Duration::from_secs(5)));
}
