//! `skylark watch` behavior.

use crate::prelude::*;

#[test]
fn watch_with_timeout_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path(), OFFLINE_CONFIG);

    let output = skylark()
        .current_dir(dir.path())
        .args(["watch", "--timeout", "300ms"])
        .timeout(std::time::Duration::from_secs(30))
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn watch_rejects_bad_timeout() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path(), OFFLINE_CONFIG);

    let output = skylark()
        .current_dir(dir.path())
        .args(["watch", "--timeout", "soonish"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid --timeout"), "got: {stderr}");
}

#[test]
fn watch_outside_a_project_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = skylark()
        .current_dir(dir.path())
        .args(["watch", "--timeout", "100ms"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
