// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn make_project(root: &Path) {
    std::fs::create_dir_all(root.join(SKAI_DIR)).unwrap();
}

#[test]
fn finds_root_in_start_dir() {
    let dir = tempfile::tempdir().unwrap();
    make_project(dir.path());
    let found = find_project_root(dir.path()).unwrap();
    assert_eq!(found, dir.path());
}

#[test]
fn finds_root_from_nested_dir() {
    let dir = tempfile::tempdir().unwrap();
    make_project(dir.path());
    let nested = dir.path().join("docs/deep");
    std::fs::create_dir_all(&nested).unwrap();
    let found = find_project_root(&nested).unwrap();
    assert_eq!(found, dir.path());
}

#[test]
fn missing_skai_reports_none() {
    let dir = tempfile::tempdir().unwrap();
    // A bare temp dir has ancestors ("/tmp", "/") that must not match.
    assert!(find_project_root(&dir.path().join("sub")).is_none());
}

#[test]
fn discover_loads_config() {
    let dir = tempfile::tempdir().unwrap();
    make_project(dir.path());
    std::fs::write(
        dir.path().join(SKAI_DIR).join("config.yaml"),
        "workers:\n  count: 3\n",
    )
    .unwrap();
    let project = Project::discover(dir.path()).unwrap();
    assert_eq!(project.config().workers.count, 3);
    assert_eq!(project.tools_dir(), dir.path().join(".skai/tools"));
}

#[test]
fn watch_paths_resolve_against_root() {
    let dir = tempfile::tempdir().unwrap();
    make_project(dir.path());
    std::fs::write(
        dir.path().join(SKAI_DIR).join("config.yaml"),
        "watch_paths: [docs]\n",
    )
    .unwrap();
    let project = Project::discover(dir.path()).unwrap();
    assert_eq!(project.watch_paths(), vec![dir.path().join("docs")]);
}
