// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skylark_adapters::{FakeContextSource, FakeTransport, NoopMonitor};
use skylark_adapters::provider::ProviderSettings;
use skylark_config::Assistant;
use skylark_core::FakeClock;
use skylark_security::GuardPolicy;

fn content_body(text: &str) -> String {
    format!(
        r#"{{"choices":[{{"message":{{"role":"assistant","content":"{}"}}}}],
           "usage":{{"prompt_tokens":1,"completion_tokens":1,"total_tokens":2}}}}"#,
        text
    )
}

struct Fixture {
    transport: Arc<FakeTransport>,
    processor: Arc<Processor<FakeClock>>,
    _dir: tempfile::TempDir,
    dir_path: PathBuf,
}

fn fixture() -> Fixture {
    fixture_with_guard(None)
}

fn fixture_with_guard(guard: Option<Arc<FileGuard>>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::new());
    let provider = Arc::new(ProviderClient::new(
        Arc::clone(&transport) as Arc<dyn skylark_adapters::ChatTransport>,
        FakeClock::new(),
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
            system_prompt: "You echo.".into(),
            dir: dir.path().join("echo"),
        })
        .unwrap();
    let processor = Arc::new(Processor::new(ProcessorDeps {
        provider,
        assistants,
        context: Arc::new(FakeContextSource::new("CTX")),
        guard,
        cancel: CancelToken::new(),
    }));
    let dir_path = dir.path().to_path_buf();
    Fixture {
        transport,
        processor,
        _dir: dir,
        dir_path,
    }
}

#[tokio::test]
async fn command_is_answered_and_invalidated() {
    let fx = fixture();
    fx.transport.push_ok(&content_body("hi"));
    let path = fx.dir_path.join("a.md");
    std::fs::write(&path, "# T\n!echo hi\n").unwrap();

    fx.processor.process_file(&path).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, "# T\n-!echo hi\n\nhi\n\n");

    // The prompt carries system prompt, context, and command text.
    let prompt = fx.transport.requests()[0].messages[0]
        .content
        .clone()
        .unwrap();
    assert!(prompt.contains("You echo."));
    assert!(prompt.contains("CTX"));
    assert!(prompt.contains("hi"));
}

#[tokio::test]
async fn unknown_assistant_leaves_file_untouched() {
    let fx = fixture();
    let path = fx.dir_path.join("a.md");
    std::fs::write(&path, "!stranger hello\n").unwrap();

    fx.processor.process_file(&path).await.unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "!stranger hello\n");
    assert_eq!(fx.transport.request_count(), 0);
}

#[tokio::test]
async fn provider_failure_becomes_error_block() {
    let fx = fixture();
    fx.transport
        .push_status(500, r#"{"error":{"message":"upstream boom","type":"server_error","code":0}}"#);
    let path = fx.dir_path.join("a.md");
    std::fs::write(&path, "!echo hi\n").unwrap();

    // The job itself succeeds; the failure lands in the response block.
    fx.processor.process_file(&path).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("-!echo hi\n\nError: "));
    assert!(written.contains("upstream boom"));
}

#[tokio::test]
async fn one_failed_command_does_not_block_others() {
    let fx = fixture();
    fx.transport
        .push_status(500, r#"{"error":{"message":"boom","type":"server_error","code":0}}"#);
    fx.transport.push_ok(&content_body("fine"));
    let path = fx.dir_path.join("a.md");
    std::fs::write(&path, "!echo one\n!echo two\n").unwrap();

    fx.processor.process_file(&path).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("Error: "));
    assert!(written.contains("fine"));
    assert!(written.contains("-!echo one"));
    assert!(written.contains("-!echo two"));
}

#[tokio::test]
async fn invalidated_lines_are_not_reprocessed() {
    let fx = fixture();
    let path = fx.dir_path.join("a.md");
    let settled = "# T\n-!echo hi\n\nhi\n\n";
    std::fs::write(&path, settled).unwrap();

    fx.processor.process_file(&path).await.unwrap();

    // Byte-identical output, no provider traffic.
    assert_eq!(std::fs::read_to_string(&path).unwrap(), settled);
    assert_eq!(fx.transport.request_count(), 0);
}

#[tokio::test]
async fn missing_file_fails_the_job() {
    let fx = fixture();
    let err = fx
        .processor
        .process_file(&fx.dir_path.join("nope.md"))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Read(_)));
}

#[tokio::test]
async fn blocked_path_fails_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let blocked_dir = dir.path().join("secrets");
    std::fs::create_dir_all(&blocked_dir).unwrap();
    let guard = Arc::new(FileGuard::new(GuardPolicy {
        allowed_paths: vec![dir.path().to_path_buf()],
        blocked_paths: vec![blocked_dir.clone()],
        ..GuardPolicy::default()
    }));

    let fx = fixture_with_guard(Some(guard));
    let path = blocked_dir.join("a.md");
    std::fs::write(&path, "!echo hi\n").unwrap();

    let err = fx.processor.process_file(&path).await.unwrap_err();
    assert!(matches!(err, JobError::Read(_)));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "!echo hi\n");
}
