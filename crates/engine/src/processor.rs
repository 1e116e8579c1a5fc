// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-file command processing.
//!
//! The processor is the job body: read the file, parse command lines,
//! assemble each command's prompt (system prompt + document context +
//! command text), ask the provider, and rewrite the file atomically.
//! Command failures are isolated: a failed command becomes an error
//! response block and the rest of the file still processes.

use crate::rewrite;
use async_trait::async_trait;
use skylark_adapters::{ContextSource, ProviderClient};
use skylark_config::AssistantSet;
use skylark_core::{CancelToken, Clock, Command, Job, JobError, Response};
use skylark_security::FileGuard;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything the processor needs, injected by the caller.
pub struct ProcessorDeps<C: Clock> {
    pub provider: Arc<ProviderClient<C>>,
    pub assistants: AssistantSet,
    pub context: Arc<dyn ContextSource>,
    pub guard: Option<Arc<FileGuard>>,
    pub cancel: CancelToken,
}

/// Turns one Markdown file's commands into response blocks.
pub struct Processor<C: Clock> {
    deps: ProcessorDeps<C>,
}

impl<C: Clock> Processor<C> {
    pub fn new(deps: ProcessorDeps<C>) -> Self {
        Self { deps }
    }

    /// Process every live command line in `path`.
    ///
    /// Returns an error only when the file itself cannot be read or
    /// written; per-command provider failures are written back as error
    /// response blocks.
    pub async fn process_file(&self, path: &Path) -> Result<(), JobError> {
        let span = tracing::info_span!("process_file", path = %path.display());
        let _guard = span.enter();

        let path = match &self.deps.guard {
            Some(guard) => guard
                .check_read(path)
                .map_err(|e| JobError::Read(e.to_string()))?,
            None => path.to_path_buf(),
        };
        let content = std::fs::read_to_string(&path)
            .map_err(|e| JobError::Read(format!("{}: {}", path.display(), e)))?;

        let commands = Command::parse_all(&content);
        if commands.is_empty() {
            tracing::debug!("no live commands");
            return Ok(());
        }

        let mut responses = Vec::new();
        for command in commands {
            let Some(assistant) = self.deps.assistants.lookup(&command.assistant_name) else {
                tracing::debug!(
                    assistant = %command.assistant_name,
                    line = command.line,
                    "no configured assistant, leaving command untouched"
                );
                continue;
            };
            let context = self.deps.context.context_for(&content, &command);
            let prompt = build_prompt(&assistant.system_prompt, &context, &command.text);
            let text = match self.deps.provider.send(&prompt, &self.deps.cancel).await {
                Ok(outcome) => {
                    tracing::info!(
                        assistant = %assistant.name,
                        line = command.line,
                        tokens = outcome.usage.total,
                        "command answered"
                    );
                    outcome.content
                }
                Err(e) => {
                    tracing::warn!(
                        assistant = %assistant.name,
                        line = command.line,
                        error = %e,
                        "command failed"
                    );
                    format!("Error: {}", e)
                }
            };
            responses.push(Response::new(command, text));
        }

        if responses.is_empty() {
            return Ok(());
        }

        if let Some(guard) = &self.deps.guard {
            guard
                .check_write(&path)
                .map_err(|e| JobError::Write(e.to_string()))?;
        }
        let updated = rewrite::apply(&content, &responses);
        write_atomic(&path, &updated).map_err(JobError::Write)?;
        tracing::info!(count = responses.len(), "file rewritten");
        Ok(())
    }
}

fn build_prompt(system_prompt: &str, context: &str, text: &str) -> String {
    let mut sections = Vec::new();
    if !system_prompt.is_empty() {
        sections.push(system_prompt);
    }
    if !context.is_empty() {
        sections.push(context);
    }
    sections.push(text);
    sections.join("\n\n")
}

/// Write through a sibling temp file and rename, so a concurrent reader
/// never sees a half-written document.
fn write_atomic(path: &Path, content: &str) -> Result<(), String> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));
    std::fs::write(&tmp_path, content)
        .map_err(|e| format!("write {}: {}", tmp_path.display(), e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        format!("rename {}: {}", path.display(), e)
    })
}

/// The job emitted by the file watcher (and the one-shot `run` walker).
pub struct FileChangeJob<C: Clock> {
    path: PathBuf,
    processor: Arc<Processor<C>>,
}

impl<C: Clock> FileChangeJob<C> {
    pub fn new(path: PathBuf, processor: Arc<Processor<C>>) -> Self {
        Self { path, processor }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<C: Clock> Job for FileChangeJob<C> {
    async fn run(&self) -> Result<(), JobError> {
        self.processor.process_file(&self.path).await
    }

    fn on_failure(&self, error: &JobError) {
        tracing::error!(path = %self.path.display(), error = %error, "file job failed");
    }

    fn describe(&self) -> String {
        format!("file-change:{}", self.path.display())
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
