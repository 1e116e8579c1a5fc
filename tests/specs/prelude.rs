//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::Path;

/// A command for the `skylark` binary.
pub fn skylark() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("skylark").expect("skylark binary builds")
}

/// Scaffold a minimal project: `.skai/` with the given config text and
/// one `echo` assistant.
pub fn scaffold_project(root: &Path, config: &str) {
    let skai = root.join(".skai");
    std::fs::create_dir_all(skai.join("assistants/echo")).unwrap();
    std::fs::create_dir_all(skai.join("tools")).unwrap();
    std::fs::create_dir_all(skai.join("logs")).unwrap();
    std::fs::write(skai.join("config.yaml"), config).unwrap();
    std::fs::write(
        skai.join("assistants/echo/prompt.md"),
        "You repeat what you are told.\n",
    )
    .unwrap();
}

/// Config with a model entry pointing at a dead local endpoint; good
/// enough for flows that never reach the provider.
pub const OFFLINE_CONFIG: &str = r#"
workers:
  count: 2
  queue_size: 16
file_watch:
  debounce_delay: 50ms
  max_delay: 500ms
models:
  local:
    test-model:
      api_key: test-key
      base_url: "http://127.0.0.1:9/v1/chat/completions"
"#;
