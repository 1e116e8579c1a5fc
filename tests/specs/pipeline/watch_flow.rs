//! End-to-end: watch → debounce → worker pool → processor → rewrite,
//! with a scripted provider transport.

use skylark_adapters::provider::ProviderSettings;
use skylark_adapters::{
    ChatTransport, FakeContextSource, FakeTransport, NoopMonitor, ProviderClient,
};
use skylark_config::{Assistant, AssistantSet};
use skylark_core::{CancelToken, SystemClock};
use skylark_engine::{
    FileWatcher, PoolConfig, Processor, ProcessorDeps, WatcherConfig, WorkerPool,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

struct Pipeline {
    transport: Arc<FakeTransport>,
    watcher: FileWatcher<SystemClock>,
    pool: Arc<WorkerPool<SystemClock>>,
}

fn content_body(text: &str) -> String {
    format!(
        r#"{{"choices":[{{"message":{{"role":"assistant","content":"{}"}}}}],
           "usage":{{"prompt_tokens":1,"completion_tokens":1,"total_tokens":2}}}}"#,
        text
    )
}

fn start_pipeline(root: &Path) -> Pipeline {
    let clock = SystemClock::new();
    let transport = Arc::new(FakeTransport::new());
    let provider = Arc::new(ProviderClient::new(
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
        clock.clone(),
        ProviderSettings {
            model: "test-model".into(),
            ..ProviderSettings::default()
        },
        Arc::new(NoopMonitor),
    ));
    let mut assistants = AssistantSet::default();
    assistants
        .insert(Assistant {
            name: "echo".into(),
            system_prompt: String::new(),
            dir: root.join("echo"),
        })
        .unwrap();
    let processor = Arc::new(Processor::new(ProcessorDeps {
        provider,
        assistants,
        context: Arc::new(FakeContextSource::new("")),
        guard: None,
        cancel: CancelToken::new(),
    }));

    let manager = Arc::new(skylark_adapters::ProcessManager::new(clock.clone()));
    let pool = WorkerPool::new(
        PoolConfig {
            workers: 2,
            queue_size: 16,
            ..PoolConfig::default()
        },
        manager,
        clock.clone(),
    );

    let watcher = FileWatcher::start(
        WatcherConfig {
            roots: vec![root.to_path_buf()],
            debounce_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            ..WatcherConfig::default()
        },
        clock,
        Arc::clone(&processor),
        pool.queue(),
    )
    .unwrap();

    Pipeline {
        transport,
        watcher,
        pool,
    }
}

async fn wait_for_content(path: &Path, expected: &str) {
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(content) = std::fs::read_to_string(path) {
            if content == expected {
                return;
            }
        }
        assert!(
            std::time::Instant::now() < deadline,
            "file never reached expected content; current: {:?}",
            std::fs::read_to_string(path).ok()
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edit_burst_is_answered_once_and_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = start_pipeline(dir.path());
    pipeline.transport.push_ok(&content_body("hi"));

    // Three rapid overwrites; the debouncer coalesces them.
    let doc = dir.path().join("a.md");
    for _ in 0..3 {
        std::fs::write(&doc, "# T\n!echo hi\n").unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
    }

    wait_for_content(&doc, "# T\n-!echo hi\n\nhi\n\n").await;
    assert_eq!(
        pipeline.transport.request_count(),
        1,
        "burst must produce exactly one provider request"
    );

    // The rewrite itself triggers one more watch cycle, which finds only
    // invalidated lines and must neither call the provider nor rewrite.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        std::fs::read_to_string(&doc).unwrap(),
        "# T\n-!echo hi\n\nhi\n\n"
    );
    assert_eq!(pipeline.transport.request_count(), 1);

    pipeline.watcher.stop().await;
    pipeline.pool.stop().await;
    let stats = pipeline.pool.stats();
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.queued, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_markdown_files_produce_no_work() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = start_pipeline(dir.path());

    std::fs::write(dir.path().join("b.txt"), "plain text").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(pipeline.transport.request_count(), 0);
    let stats = pipeline.pool.stats();
    assert_eq!(stats.processed + stats.failed, 0);

    pipeline.watcher.stop().await;
    pipeline.pool.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn provider_error_is_written_into_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = start_pipeline(dir.path());
    pipeline.transport.push_status(
        429,
        r#"{"error":{"message":"slow down","type":"rate_limit_exceeded","code":"rl"}}"#,
    );

    let doc = dir.path().join("a.md");
    std::fs::write(&doc, "!echo hi\n").unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    loop {
        let content = std::fs::read_to_string(&doc).unwrap();
        if content.starts_with("-!echo hi") {
            assert!(content.contains("Error: rate limit"), "got: {content}");
            break;
        }
        assert!(std::time::Instant::now() < deadline, "no rewrite happened");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    // A provider failure is isolated to its response block; the job
    // itself still succeeds.
    pipeline.watcher.stop().await;
    pipeline.pool.stop().await;
    assert_eq!(pipeline.pool.stats().failed, 0);
}
