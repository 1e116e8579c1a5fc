// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn records_are_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let log = AuditLog::open(&path).unwrap();

    log.record(AuditEvent::new("key_read", "api_key"));
    log.record(AuditEvent::denied(
        "blocked_path",
        Path::new("/a/b/x"),
        "read",
    ));
    log.flush().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: AuditEvent = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first.event, "key_read");
    let second: AuditEvent = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second.path.as_deref(), Some("/a/b/x"));
    assert_eq!(second.detail, "read");
}

#[test]
fn buffer_flushes_at_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let log = AuditLog::open(&path).unwrap();

    for i in 0..99 {
        log.record(AuditEvent::new("e", format!("{}", i)));
    }
    // Nothing forced a flush yet (unless 5s passed, which it didn't).
    let before = std::fs::read_to_string(&path).unwrap();
    assert_eq!(before.lines().count(), 0);

    log.record(AuditEvent::new("e", "99"));
    let after = std::fs::read_to_string(&path).unwrap();
    assert_eq!(after.lines().count(), 100);
}

#[test]
fn drop_flushes_pending_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    {
        let log = AuditLog::open(&path).unwrap();
        log.record(AuditEvent::new("shutdown", ""));
    }
    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 1);
}

#[test]
fn rotation_renames_and_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let log = AuditLog::open(&path).unwrap();

    log.record(AuditEvent::new("before", ""));
    let rotated = log.rotate().unwrap();
    assert!(rotated.exists());
    assert!(std::fs::read_to_string(&rotated).unwrap().contains("before"));

    log.record(AuditEvent::new("after", ""));
    log.flush().unwrap();
    let fresh = std::fs::read_to_string(&path).unwrap();
    assert!(fresh.contains("after"));
    assert!(!fresh.contains("before"));
}

#[cfg(unix)]
#[test]
fn file_and_dir_modes_are_restrictive() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs/audit.log");
    let log = AuditLog::open(&path).unwrap();
    log.record(AuditEvent::new("e", ""));
    log.flush().unwrap();

    let file_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(file_mode, 0o600);
    let dir_mode = std::fs::metadata(path.parent().unwrap())
        .unwrap()
        .permissions()
        .mode()
        & 0o777;
    assert_eq!(dir_mode, 0o700);
}
