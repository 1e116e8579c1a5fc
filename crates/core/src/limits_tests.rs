// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn default_is_unlimited() {
    let limits = ResourceLimits::default();
    assert!(limits.is_unlimited());
    assert_eq!(limits.max_cpu_time, Duration::ZERO);
    assert_eq!(limits.max_memory_mb, 0);
}

#[test]
fn builder_sets_each_dimension() {
    let limits = ResourceLimits::unlimited()
        .with_cpu_time(Duration::from_millis(100))
        .with_memory_mb(256)
        .with_file_size_mb(10)
        .with_max_files(64)
        .with_max_processes(4);
    assert!(!limits.is_unlimited());
    assert_eq!(limits.max_cpu_time, Duration::from_millis(100));
    assert_eq!(limits.max_memory_mb, 256);
    assert_eq!(limits.max_file_size_mb, 10);
    assert_eq!(limits.max_files, 64);
    assert_eq!(limits.max_processes, 4);
}

#[test]
fn serde_defaults_missing_fields_to_zero() {
    let limits: ResourceLimits = serde_json::from_str(r#"{"max_memory_mb": 128}"#).unwrap();
    assert_eq!(limits.max_memory_mb, 128);
    assert_eq!(limits.max_files, 0);
}
