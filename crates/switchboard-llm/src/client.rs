//! Provider-facing request/response shapes and the [`LlmClient`] trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Chat message role sent as prompt context; the gateway builds the
/// prompt with the last N messages as context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages, temperature: None, max_tokens: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// `{text, confidence, latencyMs, tokens}`. Latency
/// is stamped by the caller (the Gateway measures wall-clock around
/// `complete()`), not by the provider adapter itself.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub confidence: f32,
    pub tokens: u32,
}

/// LLM provider adapter. One implementation per upstream API shape;
/// `switchboard_llm` ships HTTP adapters for two OpenAI-compatible providers
/// plus a deterministic [`crate::mock_client::MockLlmClient`] for tests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &str;
    fn model(&self) -> &str;
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
