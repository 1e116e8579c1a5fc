// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool compilation, introspection, and sandboxed execution.

use super::schema::{validate_input, HealthOutput, UsageOutput};
use super::{Tool, ToolError, BUILTIN_TOOLS};
use crate::process::{ProcessHandle, ProcessManager, Signal};
use parking_lot::RwLock;
use skylark_core::{Clock, ResourceLimits};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for tool compilation.
pub const COMPILE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for `--usage` / `--health` probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for a normal tool invocation.
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(60);

/// How tool sources are turned into binaries.
///
/// The build argv is a template; `{src}` and `{out}` are replaced with
/// the source and binary paths. The default builds Go sources in place.
#[derive(Debug, Clone)]
pub struct ToolBuilder {
    pub source_ext: String,
    pub build_argv: Vec<String>,
}

impl Default for ToolBuilder {
    fn default() -> Self {
        Self {
            source_ext: "go".to_string(),
            build_argv: vec![
                "go".to_string(),
                "build".to_string(),
                "-o".to_string(),
                "{out}".to_string(),
                "{src}".to_string(),
            ],
        }
    }
}

impl ToolBuilder {
    fn argv_for(&self, src: &Path, out: &Path) -> Vec<String> {
        self.build_argv
            .iter()
            .map(|arg| {
                arg.replace("{src}", &src.to_string_lossy())
                    .replace("{out}", &out.to_string_lossy())
            })
            .collect()
    }
}

/// Compiles, caches, and executes tools under one tools directory.
pub struct ToolManager<C: Clock> {
    tools_dir: PathBuf,
    processes: Arc<ProcessManager<C>>,
    builder: ToolBuilder,
    sandbox_limits: RwLock<ResourceLimits>,
    tools: RwLock<HashMap<String, Tool>>,
}

impl<C: Clock> ToolManager<C> {
    pub fn new(tools_dir: PathBuf, processes: Arc<ProcessManager<C>>) -> Self {
        Self {
            tools_dir,
            processes,
            builder: ToolBuilder::default(),
            sandbox_limits: RwLock::new(ResourceLimits::default()),
            tools: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_builder(mut self, builder: ToolBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    pub fn source_ext(&self) -> &str {
        &self.builder.source_ext
    }

    /// Limits applied to every sandboxed tool invocation.
    pub fn set_sandbox_limits(&self, limits: ResourceLimits) {
        *self.sandbox_limits.write() = limits;
    }

    fn source_path(&self, name: &str) -> PathBuf {
        self.tools_dir
            .join(name)
            .join(format!("main.{}", self.builder.source_ext))
    }

    fn binary_path(&self, name: &str) -> PathBuf {
        self.tools_dir.join(name).join(name)
    }

    /// Materialize and compile the embedded built-in tools.
    pub async fn init_builtins(&self) -> Result<(), ToolError> {
        for (name, source) in BUILTIN_TOOLS {
            let src_path = self.source_path(name);
            if !src_path.exists() {
                let dir = self.tools_dir.join(name);
                std::fs::create_dir_all(&dir).map_err(|source| ToolError::Io {
                    path: dir.clone(),
                    source,
                })?;
                std::fs::write(&src_path, source).map_err(|source| ToolError::Io {
                    path: src_path.clone(),
                    source,
                })?;
                tracing::info!(name, path = %src_path.display(), "materialized built-in tool");
            }
            self.load(name).await?;
        }
        Ok(())
    }

    /// Load a tool: compile it, read its schema via `--usage`, and verify
    /// `--health`. Loaded tools are cached until invalidated.
    pub async fn load(&self, name: &str) -> Result<Tool, ToolError> {
        if let Some(tool) = self.tools.read().get(name) {
            return Ok(tool.clone());
        }

        let binary = self.compile(name).await?;

        let usage_out = self.probe(name, &binary, "--usage").await?;
        let usage: UsageOutput =
            serde_json::from_slice(&usage_out).map_err(|e| ToolError::UsageFailed {
                name: name.to_string(),
                detail: format!("bad usage JSON: {}", e),
            })?;

        let health_out = self.probe(name, &binary, "--health").await?;
        let health: HealthOutput =
            serde_json::from_slice(&health_out).map_err(|e| ToolError::HealthFailed {
                name: name.to_string(),
                detail: format!("bad health JSON: {}", e),
            })?;
        if !health.status {
            return Err(ToolError::HealthFailed {
                name: name.to_string(),
                detail: health.details.unwrap_or_else(|| "status false".to_string()),
            });
        }

        let tool = Tool {
            name: name.to_string(),
            path: binary,
            last_built: std::time::SystemTime::now(),
            schema: usage.into_schema(),
        };
        self.tools
            .write()
            .insert(name.to_string(), tool.clone());
        tracing::info!(name, "tool loaded");
        Ok(tool)
    }

    /// Rebuild the tool binary in place.
    pub async fn compile(&self, name: &str) -> Result<PathBuf, ToolError> {
        let src = self.source_path(name);
        if !src.exists() {
            return Err(ToolError::SourceMissing(src));
        }
        let out = self.binary_path(name);
        let argv = self.builder.argv_for(&src, &out);

        let handle = self
            .processes
            .new_handle(format!("build-{}", name), argv);
        handle.set_capture_stderr(true);
        if let Some(dir) = src.parent() {
            handle.set_current_dir(dir.to_path_buf());
        }
        run_handle(&handle, COMPILE_TIMEOUT)
            .await
            .map_err(|detail| ToolError::CompileFailed {
                name: name.to_string(),
                detail,
            })?;

        if let Some(tool) = self.tools.write().get_mut(name) {
            tool.last_built = std::time::SystemTime::now();
        }
        tracing::debug!(name, out = %out.display(), "tool compiled");
        Ok(out)
    }

    /// Drop a tool from the cache so the next use reloads it.
    pub fn invalidate(&self, name: &str) {
        self.tools.write().remove(name);
    }

    /// Names of currently cached tools.
    pub fn loaded(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }

    /// Execute a tool with a JSON payload on stdin, returning its stdout.
    ///
    /// The child environment is assembled from the tool's declared `env`:
    /// caller override first, then the host environment, then the
    /// declared default. PATH is always passed through.
    pub async fn execute(
        &self,
        name: &str,
        input_json: &str,
        env_overrides: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, ToolError> {
        let tool = self.load(name).await?;
        validate_input(&tool.schema, input_json)?;

        let handle = self
            .processes
            .new_handle(format!("tool-{}", name), vec![tool.path.to_string_lossy().into_owned()]);
        let _ = handle.set_limits(*self.sandbox_limits.read());
        handle.set_env(assemble_env(&tool.schema.env, env_overrides));
        handle.set_stdin(input_json.as_bytes().to_vec());
        handle.set_capture_stdout(true);
        handle.set_capture_stderr(true);

        run_handle(&handle, EXEC_TIMEOUT)
            .await
            .map_err(|detail| ToolError::ExecFailed {
                name: name.to_string(),
                detail,
            })?;
        Ok(handle.stdout_bytes())
    }

    /// Run the binary with a single flag and collect stdout.
    async fn probe(&self, name: &str, binary: &Path, flag: &str) -> Result<Vec<u8>, ToolError> {
        let handle = self.processes.new_handle(
            format!("probe-{}", name),
            vec![binary.to_string_lossy().into_owned(), flag.to_string()],
        );
        handle.set_capture_stdout(true);
        handle.set_capture_stderr(true);
        run_handle(&handle, PROBE_TIMEOUT)
            .await
            .map_err(|detail| ToolError::UsageFailed {
                name: name.to_string(),
                detail: format!("{} {}", flag, detail),
            })?;
        Ok(handle.stdout_bytes())
    }
}

/// Start a handle and wait with a wall-clock timeout; on expiry the
/// process group is killed and the elapsed time reported.
async fn run_handle<C: Clock>(
    handle: &Arc<ProcessHandle<C>>,
    timeout: Duration,
) -> Result<(), String> {
    handle.start().await.map_err(|e| e.to_string())?;
    match tokio::time::timeout(timeout, handle.wait()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            let stderr = String::from_utf8_lossy(&handle.stderr_bytes()).trim().to_string();
            if stderr.is_empty() {
                Err(e.to_string())
            } else {
                Err(format!("{} ({})", e, stderr))
            }
        }
        Err(_elapsed) => {
            let _ = handle.signal(Signal::Kill);
            let _ = handle.wait().await;
            Err(format!("timed out after {}s", timeout.as_secs()))
        }
    }
}

fn assemble_env(
    declared: &BTreeMap<String, super::EnvVar>,
    overrides: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let mut env = Vec::new();
    if let Ok(path) = std::env::var("PATH") {
        env.push(("PATH".to_string(), path));
    }
    for (name, decl) in declared {
        if let Some(value) = overrides.get(name) {
            env.push((name.clone(), value.clone()));
        } else if let Ok(value) = std::env::var(name) {
            env.push((name.clone(), value));
        } else if let Some(default) = &decl.default {
            env.push((name.clone(), default.clone()));
        }
    }
    env
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
