//! OpenAI-compatible chat-completions adapter, accepting a configurable
//! base URL so it also serves any OpenAI-compatible gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, Role};
use crate::error::{LlmError, Result};

pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiCompatibleClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
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
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct Response {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Default confidence assigned to a successful completion when the provider
/// does not return its own score.
const DEFAULT_CONFIDENCE: f32 = 0.9;

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let messages: Vec<WireMessage> = request
            .messages
            .iter()
            .map(|m: &ChatMessage| WireMessage { role: role_str(m.role), content: m.content.clone() })
            .collect();

        let body = Request {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
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
            if body.contains("model") && (body.contains("does not exist") || body.contains("not found")) {
                return Err(LlmError::NotAvailable { model: self.model.clone() });
            }
            return Err(LlmError::Llm(format!("http {status}: {body}")));
        }

        let parsed: Response = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        let tokens = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok(CompletionResponse { text, confidence: DEFAULT_CONFIDENCE, tokens })
    }
}
