//! Anthropic Messages-API adapter, a second HTTP provider using the same
//! `reqwest`-based request/response mapping as
//! [`super::openai_compatible::OpenAiCompatibleClient`], adjusted for the
//! Messages API's separate `system` field and `content` array shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, Role};
use crate::error::{LlmError, Result};

pub struct AnthropicCompatibleClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicCompatibleClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct Request {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct Response {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

const DEFAULT_CONFIDENCE: f32 = 0.9;
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[async_trait]
impl LlmClient for AnthropicCompatibleClient {
    fn provider(&self) -> &str {
        "anthropic-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let system = request
            .messages
            .iter()
            .find(|m: &&ChatMessage| m.role == Role::System)
            .map(|m| m.content.clone());

        let messages: Vec<WireMessage> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| WireMessage {
                role: if m.role == Role::User { "user" } else { "assistant" },
                content: m.content.clone(),
            })
            .collect();

        let body = Request {
            model: self.model.clone(),
            system,
            messages,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
        };

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(LlmError::RateLimited { retry_after_secs: retry_after });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Auth(body));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::NotAvailable { model: self.model.clone() });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("model") && body.contains("not_found") {
                return Err(LlmError::NotAvailable { model: self.model.clone() });
            }
            return Err(LlmError::Llm(format!("http {status}: {body}")));
        }

        let parsed: Response = response.json().await?;
        let text = parsed.content.into_iter().map(|block| block.text).collect::<Vec<_>>().join("");
        let tokens = parsed
            .usage
            .map(|u| u.input_tokens + u.output_tokens)
            .unwrap_or(0);

        Ok(CompletionResponse { text, confidence: DEFAULT_CONFIDENCE, tokens })
    }
}
