// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `config.yaml` schema and loading.
//!
//! Every field has a default so a missing or empty file yields a usable
//! configuration. Durations are YAML strings ("100ms", "5m") parsed with
//! the shared duration parser.

use serde::{Deserialize, Serialize};
use skylark_core::parse_duration;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid duration for {field}: {message}")]
    Duration { field: &'static str, message: String },
    #[error("ambiguous assistant names: {0:?} differ only by case")]
    AmbiguousAssistants(Vec<String>),
}

/// Worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub count: usize,
    pub queue_size: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: 4,
            queue_size: 100,
        }
    }
}

/// File-watch tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWatchConfig {
    /// Quiet period before a change burst is delivered.
    pub debounce_delay: String,
    /// Hard cap from the first pending event.
    pub max_delay: String,
    /// Extensions that produce jobs.
    pub extensions: Vec<String>,
}

impl Default for FileWatchConfig {
    fn default() -> Self {
        Self {
            debounce_delay: "300ms".to_string(),
            max_delay: "2s".to_string(),
            extensions: vec![".md".to_string()],
        }
    }
}

impl FileWatchConfig {
    pub fn debounce_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.debounce_delay).map_err(|message| ConfigError::Duration {
            field: "file_watch.debounce_delay",
            message,
        })
    }

    pub fn max_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.max_delay).map_err(|message| ConfigError::Duration {
            field: "file_watch.max_delay",
            message,
        })
    }
}

/// One model entry under `models.<provider>.<model>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub requests_per_minute: Option<u32>,
    pub tokens_per_minute: Option<u32>,
}

/// Per-tool settings (`tools.<name>`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub env: BTreeMap<String, String>,
}

/// `security.file_permissions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePermissionsConfig {
    pub allowed_paths: Vec<PathBuf>,
    pub blocked_paths: Vec<PathBuf>,
    pub allow_symlinks: bool,
    /// Bytes; zero means no ceiling.
    pub max_file_size: u64,
}

impl Default for FilePermissionsConfig {
    fn default() -> Self {
        Self {
            allowed_paths: Vec::new(),
            blocked_paths: Vec::new(),
            allow_symlinks: false,
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

/// `security.audit_log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditLogConfig {
    pub enabled: bool,
    pub path: Option<PathBuf>,
    pub retention_days: u32,
    pub events: Vec<String>,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            retention_days: 30,
            events: Vec::new(),
        }
    }
}

/// `security.*`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub file_permissions: FilePermissionsConfig,
    pub audit_log: AuditLogConfig,
    /// Hex- or base64-encoded 32-byte key for the key store.
    pub encryption_key: Option<String>,
    pub key_storage_path: Option<PathBuf>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workers: WorkersConfig,
    pub file_watch: FileWatchConfig,
    pub watch_paths: Vec<PathBuf>,
    /// provider → model → settings
    pub models: BTreeMap<String, BTreeMap<String, ModelConfig>>,
    pub tools: BTreeMap<String, ToolConfig>,
    pub security: SecurityConfig,
}

impl Config {
    /// Parse configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        // Surface bad durations at load time rather than first use.
        config.file_watch.debounce_delay()?;
        config.file_watch.max_delay()?;
        Ok(config)
    }

    /// Load `config.yaml` from a `.skai` directory. A missing file yields
    /// the defaults.
    pub fn load(skai_dir: &Path) -> Result<Self, ConfigError> {
        let path = skai_dir.join("config.yaml");
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::from_yaml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    /// Watch roots, defaulting to the current directory.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        if self.watch_paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.watch_paths.clone()
        }
    }

    /// Look up a model entry by `provider` and `model` name.
    pub fn model(&self, provider: &str, model: &str) -> Option<&ModelConfig> {
        self.models.get(provider).and_then(|m| m.get(model))
    }

    /// The first configured model entry, in (provider, model) order.
    pub fn default_model(&self) -> Option<(&str, &str, &ModelConfig)> {
        self.models.iter().find_map(|(provider, models)| {
            models
                .iter()
                .next()
                .map(|(model, cfg)| (provider.as_str(), model.as_str(), cfg))
        })
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
