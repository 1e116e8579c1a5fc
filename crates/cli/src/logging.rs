// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tracing bootstrap.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn filter() -> EnvFilter {
    EnvFilter::try_from_env("SKYLARK_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr only (one-shot commands).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log to stderr and to a daily-rotated file under `log_dir` (watch
/// mode). The returned guard must stay alive for the file writer to
/// flush.
pub fn init_with_file(log_dir: &Path) -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::daily(log_dir, "skylark.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(file_writer)
        .try_init();
    if result.is_err() {
        // A subscriber was already installed (tests); drop the file layer.
        return None;
    }
    Some(guard)
}
