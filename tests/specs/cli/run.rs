//! `skylark run` behavior.

use crate::prelude::*;

#[test]
fn run_outside_a_project_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = skylark().current_dir(dir.path()).arg("run").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no project found"), "got: {stderr}");
}

#[test]
fn run_without_a_model_fails_with_guidance() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path(), "");
    let output = skylark().current_dir(dir.path()).arg("run").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no model configured"), "got: {stderr}");
}

#[test]
fn run_with_no_matching_files_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path(), OFFLINE_CONFIG);
    std::fs::write(dir.path().join("notes.txt"), "not markdown").unwrap();

    let output = skylark().current_dir(dir.path()).arg("run").output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("processed 0 file(s)"), "got: {stdout}");
}

#[test]
fn run_leaves_files_without_known_assistants_untouched() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path(), OFFLINE_CONFIG);
    let doc = dir.path().join("doc.md");
    std::fs::write(&doc, "# Notes\n!stranger do something\n").unwrap();

    // The only command addresses an unconfigured assistant, so the
    // provider is never reached and the file survives byte-for-byte.
    let output = skylark().current_dir(dir.path()).arg("run").output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        std::fs::read_to_string(&doc).unwrap(),
        "# Notes\n!stranger do something\n"
    );
}

#[test]
fn run_skips_invalidated_commands() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path(), OFFLINE_CONFIG);
    let doc = dir.path().join("doc.md");
    let settled = "# Notes\n-!echo hi\n\nhi\n\n";
    std::fs::write(&doc, settled).unwrap();

    let output = skylark().current_dir(dir.path()).arg("run").output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(std::fs::read_to_string(&doc).unwrap(), settled);
}
