// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project-root discovery.
//!
//! The nearest ancestor containing a `.skai/` directory is the project
//! root; everything the runtime needs lives under that tree.

use crate::schema::{Config, ConfigError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project-local directory.
pub const SKAI_DIR: &str = ".skai";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("no {SKAI_DIR} directory found above {0}")]
    NotFound(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Walk up from `start` looking for a directory containing `.skai/`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(start)
    };
    loop {
        if dir.join(SKAI_DIR).is_dir() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// A located project with its loaded configuration.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Discover the project containing `start` and load its config.
    pub fn discover(start: &Path) -> Result<Self, ProjectError> {
        let root =
            find_project_root(start).ok_or_else(|| ProjectError::NotFound(start.to_path_buf()))?;
        let config = Config::load(&root.join(SKAI_DIR))?;
        Ok(Self { root, config })
    }

    /// Open a project at a known root (used by `init` and tests).
    pub fn open(root: PathBuf) -> Result<Self, ProjectError> {
        let config = Config::load(&root.join(SKAI_DIR))?;
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn skai_dir(&self) -> PathBuf {
        self.root.join(SKAI_DIR)
    }

    pub fn assistants_dir(&self) -> PathBuf {
        self.skai_dir().join("assistants")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.skai_dir().join("tools")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.skai_dir().join("logs")
    }

    /// Watch roots resolved against the project root.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        self.config
            .watch_paths()
            .into_iter()
            .map(|p| {
                if p.is_absolute() {
                    p
                } else {
                    self.root.join(p)
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
