//! CLI surface: version, help, init.

use crate::prelude::*;

#[test]
fn version_prints_semver() {
    let output = skylark().arg("version").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.starts_with("skylark "), "got: {text}");
}

#[test]
fn help_lists_subcommands() {
    let output = skylark().arg("--help").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["init", "watch", "run", "version"] {
        assert!(text.contains(subcommand), "help is missing {subcommand}");
    }
}

#[test]
fn unknown_subcommand_fails() {
    skylark().arg("frobnicate").assert().failure();
}

#[test]
fn init_scaffolds_project() {
    let dir = tempfile::tempdir().unwrap();
    skylark()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    assert!(dir.path().join(".skai/config.yaml").is_file());
    assert!(dir
        .path()
        .join(".skai/assistants/assistant/prompt.md")
        .is_file());
    assert!(dir.path().join(".skai/tools").is_dir());
}

#[test]
fn init_with_name_creates_subdirectory() {
    let dir = tempfile::tempdir().unwrap();
    skylark()
        .current_dir(dir.path())
        .args(["init", "myproject"])
        .assert()
        .success();
    assert!(dir.path().join("myproject/.skai/config.yaml").is_file());
}

#[test]
fn init_twice_is_safe() {
    let dir = tempfile::tempdir().unwrap();
    skylark().current_dir(dir.path()).arg("init").assert().success();
    skylark().current_dir(dir.path()).arg("init").assert().success();
}
