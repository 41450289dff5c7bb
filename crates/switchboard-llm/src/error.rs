use thiserror::Error;

/// LLM Gateway error kinds.
///
/// `NotAvailable` is the single signal that triggers candidate-list
/// failover; `RateLimited` triggers the `needs_help` + fallback path;
/// everything else is fallback-eligible but does not cross models.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("provider error: {0}")]
    Llm(String),

    #[error("model not available: {model}")]
    NotAvailable { model: String },

    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request timed out")]
    Timeout,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LlmError>;

impl LlmError {
    /// Whether a same-model retry (not a candidate-list failover) is worth
    /// attempting.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. } | LlmError::Timeout | LlmError::Http(_)
        )
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }

    /// Whether this is the "model-not-available" signal that triggers
    /// candidate-list failover, and nothing else.
    pub fn is_model_not_available(&self) -> bool {
        matches!(self, LlmError::NotAvailable { .. })
    }
}
