//! Deterministic mock client for routing-engine and gateway tests (grounded
//! on `llm::mock_client::MockLlmClient`).

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::{CompletionRequest, CompletionResponse, LlmClient};
use crate::error::{LlmError, Result};

#[derive(Debug, Clone)]
pub enum MockStep {
    Text(String),
    NotAvailable,
    RateLimited,
    Error(String),
}

#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    provider: String,
    model: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
}

impl MockLlmClient {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn from_steps(provider: impl Into<String>, model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::from(steps))),
        }
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    async fn next_step(&self) -> Option<MockStep> {
        self.script.lock().await.pop_front()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let Some(step) = self.next_step().await else {
            let echo = request
                .messages
                .iter()
                .rev()
                .find(|m| m.role == crate::client::Role::User)
                .map(|m| format!("mock-echo: {}", m.content))
                .unwrap_or_else(|| "mock-ok".to_string());
            return Ok(CompletionResponse { confidence: 0.9, tokens: echo.len() as u32, text: echo });
        };

        match step {
            MockStep::Text(text) => Ok(CompletionResponse { tokens: text.len() as u32, text, confidence: 0.9 }),
            MockStep::NotAvailable => Err(LlmError::NotAvailable { model: self.model.clone() }),
            MockStep::RateLimited => Err(LlmError::RateLimited { retry_after_secs: None }),
            MockStep::Error(message) => Err(LlmError::Llm(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatMessage;

    #[tokio::test]
    async fn returns_scripted_text() {
        let client = MockLlmClient::from_steps("mock", "mock-model", vec![MockStep::Text("hello".to_string())]);
        let response = client
            .complete(CompletionRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap();
        assert_eq!(response.text, "hello");
    }

    #[tokio::test]
    async fn falls_back_to_echo_when_script_exhausted() {
        let client = MockLlmClient::new("mock", "mock-model");
        let response = client
            .complete(CompletionRequest::new(vec![ChatMessage::user("ping")]))
            .await
            .unwrap();
        assert_eq!(response.text, "mock-echo: ping");
    }

    #[tokio::test]
    async fn scripted_not_available_surfaces_error() {
        let client = MockLlmClient::from_steps("mock", "m0", vec![MockStep::NotAvailable]);
        let err = client
            .complete(CompletionRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(err.is_model_not_available());
    }
}
