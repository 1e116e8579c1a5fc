// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_text_yields_defaults() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config.workers.count, 4);
    assert_eq!(config.workers.queue_size, 100);
    assert_eq!(config.file_watch.extensions, vec![".md"]);
    assert_eq!(
        config.file_watch.debounce_delay().unwrap(),
        Duration::from_millis(300)
    );
    assert_eq!(config.watch_paths(), vec![PathBuf::from(".")]);
}

#[test]
fn parses_full_document() {
    let yaml = r#"
workers:
  count: 2
  queue_size: 10
file_watch:
  debounce_delay: 100ms
  max_delay: 1s
  extensions: [".md", ".markdown"]
watch_paths:
  - docs
  - notes
models:
  openai:
    gpt-4o:
      api_key: sk-test
      temperature: 0.2
      max_tokens: 1024
tools:
  weather:
    env:
      API_KEY: abc
security:
  file_permissions:
    allowed_paths: ["/a"]
    blocked_paths: ["/a/b"]
    allow_symlinks: false
    max_file_size: 1048576
  audit_log:
    enabled: true
    retention_days: 7
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.workers.count, 2);
    assert_eq!(
        config.file_watch.debounce_delay().unwrap(),
        Duration::from_millis(100)
    );
    assert_eq!(config.watch_paths().len(), 2);

    let model = config.model("openai", "gpt-4o").unwrap();
    assert_eq!(model.api_key, "sk-test");
    assert_eq!(model.max_tokens, Some(1024));

    let (provider, model_name, _) = config.default_model().unwrap();
    assert_eq!((provider, model_name), ("openai", "gpt-4o"));

    assert_eq!(config.tools["weather"].env["API_KEY"], "abc");
    assert!(config.security.audit_log.enabled);
    assert_eq!(config.security.file_permissions.max_file_size, 1_048_576);
}

#[test]
fn bad_duration_fails_at_load() {
    let yaml = "file_watch:\n  debounce_delay: soon\n";
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Duration { field, .. }
        if field == "file_watch.debounce_delay"));
}

#[test]
fn unknown_model_is_none() {
    let config = Config::from_yaml("").unwrap();
    assert!(config.model("openai", "gpt-4o").is_none());
    assert!(config.default_model().is_none());
}

#[test]
fn load_missing_file_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(dir.path()).unwrap();
    assert_eq!(config.workers.count, 4);
}

#[test]
fn load_reads_config_yaml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.yaml"), "workers:\n  count: 8\n").unwrap();
    let config = Config::load(dir.path()).unwrap();
    assert_eq!(config.workers.count, 8);
}
