// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The provider request cycle and tool-call loop.

use super::monitor::{Monitor, TokenUsage};
use super::rate_limit::RateLimiter;
use super::transport::{ChatTransport, RawResponse};
use super::wire::{ChatMessage, ChatRequest, ChatResponse, ErrorBody, ToolDef};
use super::ProviderError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use skylark_core::{CancelToken, Clock};
use std::collections::HashMap;
use std::sync::Arc;

/// Executes one registered tool against an arguments JSON object.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the tool's stdout (expected to be JSON) or an error text.
    async fn execute(&self, input_json: &str) -> Result<String, String>;
}

/// A tool the model may call.
#[derive(Clone)]
pub struct RegisteredTool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub executor: Arc<dyn ToolExecutor>,
}

/// Model parameters for one client instance.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub requests_per_minute: u32,
    pub tokens_per_minute: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            requests_per_minute: 60,
            tokens_per_minute: 90_000,
        }
    }
}

/// Final result of a send, with usage summed across the tool loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub content: String,
    pub usage: TokenUsage,
}

/// Rate-limited chat client.
pub struct ProviderClient<C: Clock> {
    transport: Arc<dyn ChatTransport>,
    limiter: RateLimiter<C>,
    monitor: Arc<dyn Monitor>,
    settings: ProviderSettings,
    clock: C,
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl<C: Clock> ProviderClient<C> {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        clock: C,
        settings: ProviderSettings,
        monitor: Arc<dyn Monitor>,
    ) -> Self {
        let limiter = RateLimiter::new(
            clock.clone(),
            settings.requests_per_minute,
            settings.tokens_per_minute,
        );
        Self {
            transport,
            limiter,
            monitor,
            settings,
            clock,
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Make a tool available to the model.
    pub fn register_tool(&self, tool: RegisteredTool) {
        self.tools.write().insert(tool.name.clone(), tool);
    }

    pub fn registered_tools(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }

    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }

    /// Send `prompt` and drive the tool loop to a final text answer.
    ///
    /// Every iteration re-enters the rate limiter and reports to the
    /// monitor; usage is summed across iterations.
    pub async fn send(
        &self,
        prompt: &str,
        cancel: &CancelToken,
    ) -> Result<ChatOutcome, ProviderError> {
        let mut messages = vec![ChatMessage::user(prompt)];
        let mut usage_sum = TokenUsage::default();

        loop {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            self.limiter.wait(cancel).await?;

            let request = self.build_request(&messages);
            let started = self.clock.now();
            let raw = match self.transport.send(&request).await {
                Ok(raw) => raw,
                Err(e) => {
                    self.monitor.record_error(&self.settings.model, e.kind());
                    return Err(e);
                }
            };
            let latency = self.clock.now().saturating_duration_since(started);

            let response = match parse_response(raw) {
                Ok(response) => response,
                Err(e) => {
                    self.monitor.record_error(&self.settings.model, e.kind());
                    return Err(e);
                }
            };

            let usage = response.usage.unwrap_or_default();
            let usage = TokenUsage {
                prompt: usage.prompt_tokens,
                completion: usage.completion_tokens,
                total: usage.total_tokens,
            };
            self.limiter.add_tokens(usage.total)?;
            self.monitor
                .record_request(&self.settings.model, usage, latency);
            usage_sum += usage;

            let message = response
                .choices
                .into_iter()
                .next()
                .map(|c| c.message)
                .ok_or_else(|| ProviderError::ServerError("response has no choices".into()))?;

            let calls = message.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                return Ok(ChatOutcome {
                    content: message.content.unwrap_or_default(),
                    usage: usage_sum,
                });
            }

            tracing::debug!(count = calls.len(), "model requested tool calls");
            messages.push(message);
            for call in calls {
                let tool = self
                    .tools
                    .read()
                    .get(&call.function.name)
                    .cloned()
                    .ok_or_else(|| ProviderError::UnknownTool(call.function.name.clone()))?;
                let output = tool
                    .executor
                    .execute(&call.function.arguments)
                    .await
                    .map_err(|message| ProviderError::ToolFailed {
                        name: call.function.name.clone(),
                        message,
                    })?;
                messages.push(ChatMessage::tool_result(call.id, output));
            }
        }
    }

    fn build_request(&self, messages: &[ChatMessage]) -> ChatRequest {
        let tools = {
            let registry = self.tools.read();
            if registry.is_empty() {
                None
            } else {
                let mut defs: Vec<ToolDef> = registry
                    .values()
                    .map(|t| ToolDef::function(&t.name, &t.description, t.parameters.clone()))
                    .collect();
                defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
                Some(defs)
            }
        };
        ChatRequest {
            model: self.settings.model.clone(),
            messages: messages.to_vec(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            top_p: self.settings.top_p,
            tools,
        }
    }
}

/// Map a raw response to a parsed body or a classified error.
fn parse_response(raw: RawResponse) -> Result<ChatResponse, ProviderError> {
    if raw.status == 200 {
        return serde_json::from_slice(&raw.body)
            .map_err(|e| ProviderError::ServerError(format!("decode response: {}", e)));
    }
    let detail = serde_json::from_slice::<ErrorBody>(&raw.body)
        .map(|b| b.error)
        .unwrap_or_default();
    let message = if detail.message.is_empty() {
        format!("status {}", raw.status)
    } else {
        detail.message.clone()
    };
    let code = detail.code_str();
    let marker = if detail.kind.is_empty() { code.as_str() } else { detail.kind.as_str() };
    let err = match marker {
        m if m.contains("rate_limit") => ProviderError::RateLimit(message),
        m if m.contains("authentication") || m.contains("invalid_api_key") => {
            ProviderError::Authentication(message)
        }
        m if m.contains("invalid_request") || m.contains("invalid_input") => {
            ProviderError::InvalidInput(message)
        }
        _ => match raw.status {
            401 | 403 => ProviderError::Authentication(message),
            429 => ProviderError::RateLimit(message),
            400 | 422 => ProviderError::InvalidInput(message),
            _ => ProviderError::ServerError(message),
        },
    };
    Err(err)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
