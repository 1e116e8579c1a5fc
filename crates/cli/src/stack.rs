// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the full runtime stack from a project's configuration:
//! security guards, process manager, tool manager, provider client,
//! processor, and worker pool.

use anyhow::{bail, Context, Result};
use skylark_adapters::provider::ProviderSettings;
use skylark_adapters::tool::{ToolCallAdapter, ToolWatcher};
use skylark_adapters::{
    HeaderContext, HttpTransport, NoopMonitor, ProcessManager, ProviderClient, RegisteredTool,
    ToolManager,
};
use skylark_config::{AssistantSet, ModelConfig, Project};
use skylark_core::{CancelToken, Job, ResourceLimits, SystemClock};
use skylark_engine::{PoolConfig, Processor, ProcessorDeps, WatcherConfig, WorkerPool};
use skylark_security::{AuditLog, FileGuard, GuardPolicy, KeyStore};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Default chat-completions endpoint used when a model entry has no
/// explicit `base_url`.
const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// The assembled runtime.
pub struct Stack {
    pub pool: Arc<WorkerPool<SystemClock>>,
    pub processor: Arc<Processor<SystemClock>>,
    pub job_tx: mpsc::Sender<Arc<dyn Job>>,
    pub watcher_config: WatcherConfig,
    pub audit: Option<Arc<AuditLog>>,
    pub cancel: CancelToken,
    /// Kept alive for hot tool recompilation.
    pub tool_watcher: Option<ToolWatcher>,
}

pub async fn build(project: &Project) -> Result<Stack> {
    let clock = SystemClock::new();
    let config = project.config();
    let cancel = CancelToken::new();

    // Security: audit log, then the file guard that reports into it.
    let audit = if config.security.audit_log.enabled {
        let path = config
            .security
            .audit_log
            .path
            .clone()
            .unwrap_or_else(|| project.logs_dir().join("audit.log"));
        Some(Arc::new(
            AuditLog::open(&path).context("opening audit log")?,
        ))
    } else {
        None
    };
    let permissions = &config.security.file_permissions;
    let guard = if permissions.allowed_paths.is_empty() && permissions.blocked_paths.is_empty() {
        None
    } else {
        let mut guard = FileGuard::new(GuardPolicy {
            allowed_paths: permissions.allowed_paths.clone(),
            blocked_paths: permissions.blocked_paths.clone(),
            allow_symlinks: permissions.allow_symlinks,
            max_file_size: permissions.max_file_size,
        });
        if let Some(audit) = &audit {
            guard = guard.with_audit(Arc::clone(audit));
        }
        Some(Arc::new(guard))
    };

    // Processes and tools.
    let manager = Arc::new(ProcessManager::new(clock.clone()));
    let tools = Arc::new(ToolManager::new(project.tools_dir(), Arc::clone(&manager)));
    if let Err(e) = tools.init_builtins().await {
        tracing::warn!(error = %e, "built-in tools unavailable");
    }
    let tool_watcher = match ToolWatcher::start(Arc::clone(&tools)) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "tool hot-recompile disabled");
            None
        }
    };

    // Provider.
    let (provider_name, model_name, model_cfg) = config
        .default_model()
        .map(|(p, m, c)| (p.to_string(), m.to_string(), c.clone()))
        .context("no model configured under `models` in config.yaml")?;
    let api_key = resolve_api_key(project, &provider_name, &model_cfg)?;
    let url = model_cfg
        .base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string());
    let transport =
        Arc::new(HttpTransport::new(url, api_key).context("building provider transport")?);
    let provider = Arc::new(ProviderClient::new(
        transport,
        clock.clone(),
        ProviderSettings {
            model: model_name,
            temperature: model_cfg.temperature,
            max_tokens: model_cfg.max_tokens,
            top_p: model_cfg.top_p,
            requests_per_minute: model_cfg.requests_per_minute.unwrap_or(60),
            tokens_per_minute: model_cfg.tokens_per_minute.unwrap_or(90_000),
        },
        Arc::new(NoopMonitor),
    ));

    // Register every loadable tool: builtins plus the configured ones.
    let mut tool_names: Vec<String> = tools.loaded();
    for name in config.tools.keys() {
        if !tool_names.contains(name) {
            tool_names.push(name.clone());
        }
    }
    for name in tool_names {
        match tools.load(&name).await {
            Ok(tool) => {
                let env = config
                    .tools
                    .get(&name)
                    .map(|t| t.env.clone())
                    .unwrap_or_default();
                provider.register_tool(RegisteredTool {
                    name: tool.schema.name.clone(),
                    description: tool.schema.description.clone(),
                    parameters: tool.schema.parameters.clone(),
                    executor: Arc::new(ToolCallAdapter::new(Arc::clone(&tools), name, env)),
                });
            }
            Err(e) => tracing::warn!(tool = %name, error = %e, "tool not registered"),
        }
    }

    // Assistants and the processor.
    let assistants =
        AssistantSet::load(&project.assistants_dir()).context("loading assistants")?;
    if assistants.is_empty() {
        tracing::warn!("no assistants configured; commands will be left untouched");
    }
    let processor = Arc::new(Processor::new(ProcessorDeps {
        provider,
        assistants,
        context: Arc::new(HeaderContext::default()),
        guard,
        cancel: cancel.clone(),
    }));

    // Worker pool.
    let pool = WorkerPool::new(
        PoolConfig {
            workers: config.workers.count,
            queue_size: config.workers.queue_size,
            limits: ResourceLimits::default(),
            ..PoolConfig::default()
        },
        Arc::clone(&manager),
        clock,
    );
    let job_tx = pool.queue();

    let watcher_config = WatcherConfig {
        roots: project.watch_paths(),
        extensions: config.file_watch.extensions.clone(),
        debounce_delay: config.file_watch.debounce_delay()?,
        max_delay: config.file_watch.max_delay()?,
        ..WatcherConfig::default()
    };

    Ok(Stack {
        pool,
        processor,
        job_tx,
        watcher_config,
        audit,
        cancel,
        tool_watcher,
    })
}

/// API key resolution: config value, then environment, then key store.
fn resolve_api_key(
    project: &Project,
    provider_name: &str,
    model_cfg: &ModelConfig,
) -> Result<String> {
    if !model_cfg.api_key.is_empty() {
        return Ok(model_cfg.api_key.clone());
    }
    if let Ok(key) = std::env::var("SKYLARK_API_KEY") {
        if !key.is_empty() {
            return Ok(key);
        }
    }
    let security = &project.config().security;
    if let (Some(encryption_key), Some(store_path)) =
        (&security.encryption_key, &security.key_storage_path)
    {
        let key_bytes = decode_encryption_key(encryption_key)?;
        let store = KeyStore::open(store_path, &key_bytes).context("opening key store")?;
        let entry_name = format!("{}_api_key", provider_name);
        if let Ok(value) = store.get(&entry_name) {
            return Ok(value);
        }
    }
    bail!(
        "no API key for provider {:?}: set models.{}.<model>.api_key, \
         SKYLARK_API_KEY, or store `{}_api_key` in the key store",
        provider_name,
        provider_name,
        provider_name
    )
}

/// The configured encryption key is hex (64 chars) or raw (32 chars).
fn decode_encryption_key(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    if text.len() == 64 && text.chars().all(|c| c.is_ascii_hexdigit()) {
        let mut out = Vec::with_capacity(32);
        let bytes = text.as_bytes();
        for pair in bytes.chunks(2) {
            let hi = (bytes_to_nibble(pair[0])?) << 4;
            let lo = bytes_to_nibble(pair[1])?;
            out.push(hi | lo);
        }
        return Ok(out);
    }
    if text.len() == 32 {
        return Ok(text.as_bytes().to_vec());
    }
    bail!("security.encryption_key must be 32 raw bytes or 64 hex characters")
}

fn bytes_to_nibble(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => bail!("invalid hex in encryption key"),
    }
}
