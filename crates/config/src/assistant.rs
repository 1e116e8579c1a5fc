// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assistant definitions.
//!
//! Each assistant lives in `.skai/assistants/<name>/` with a `prompt.md`
//! system prompt and an optional `knowledge/` tree.

use skylark_core::command::normalize_name;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("ambiguous assistant names: {first:?} and {second:?} differ only by case")]
    Ambiguous { first: String, second: String },
}

/// A configured assistant.
#[derive(Debug, Clone)]
pub struct Assistant {
    pub name: String,
    pub system_prompt: String,
    pub dir: PathBuf,
}

impl Assistant {
    pub fn knowledge_dir(&self) -> PathBuf {
        self.dir.join("knowledge")
    }
}

/// The set of assistants for a project, keyed for command lookup.
#[derive(Debug, Clone, Default)]
pub struct AssistantSet {
    by_name: BTreeMap<String, Assistant>,
}

impl AssistantSet {
    /// Load every assistant under `assistants_dir`. A missing directory
    /// yields an empty set. Punctuation-free names that collide after
    /// lowercasing are rejected rather than resolved by guesswork.
    pub fn load(assistants_dir: &Path) -> Result<Self, AssistantError> {
        let mut set = Self::default();
        let entries = match std::fs::read_dir(assistants_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(set),
            Err(source) => {
                return Err(AssistantError::Io {
                    path: assistants_dir.to_path_buf(),
                    source,
                })
            }
        };
        for entry in entries {
            let entry = entry.map_err(|source| AssistantError::Io {
                path: assistants_dir.to_path_buf(),
                source,
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let dir = entry.path();
            let prompt_path = dir.join("prompt.md");
            let system_prompt = match std::fs::read_to_string(&prompt_path) {
                Ok(text) => text.trim().to_string(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                Err(source) => {
                    return Err(AssistantError::Io {
                        path: prompt_path,
                        source,
                    })
                }
            };
            set.insert(Assistant {
                name,
                system_prompt,
                dir,
            })?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, assistant: Assistant) -> Result<(), AssistantError> {
        let key = normalize_name(&assistant.name);
        if let Some(existing) = self.by_name.get(&key) {
            if existing.name != assistant.name {
                return Err(AssistantError::Ambiguous {
                    first: existing.name.clone(),
                    second: assistant.name,
                });
            }
        }
        self.by_name.insert(key, assistant);
        Ok(())
    }

    /// Look up an assistant by a command's (already normalized) name.
    pub fn lookup(&self, name: &str) -> Option<&Assistant> {
        self.by_name.get(&normalize_name(name))
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.values().map(|a| a.name.as_str())
    }
}

#[cfg(test)]
#[path = "assistant_tests.rs"]
mod tests;
