//! Top-level LLM Gateway: one process-wide [`LlmSwitcher`] wrapped with
//! same-model retry/backoff and a wall-clock budget.

use std::time::{Duration, Instant};

use crate::client::{CompletionRequest, LlmClient};
use crate::error::{LlmError, Result};
use crate::retry::LlmRetryConfig;
use crate::switcher::{Health, LlmSwitcher};

/// `{text, confidence, latencyMs, tokens}`.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub text: String,
    pub confidence: f32,
    pub latency_ms: u64,
    pub tokens: u32,
}

/// Deterministic reply shown when the LLM is unavailable, persisted as a
/// `bot` turn with `confidence=0`.
pub const FALLBACK_TEXT: &str =
    "I'm sorry, I'm having trouble reaching our assistant right now. A team member will follow up shortly.";

/// Wall-clock budget for a single LLM call; exceeding it is a fallback-
/// eligible failure.
const CALL_BUDGET: Duration = Duration::from_secs(30);

pub struct LlmGateway {
    switcher: LlmSwitcher,
    retry_config: LlmRetryConfig,
}

impl LlmGateway {
    pub fn new(switcher: LlmSwitcher, retry_config: LlmRetryConfig) -> Self {
        Self { switcher, retry_config }
    }

    pub fn health(&self) -> Health {
        self.switcher.health()
    }

    pub fn current_model(&self) -> String {
        self.switcher.current_model()
    }

    /// Runs `request` against the active client
    /// with same-model retry/backoff on transient errors, candidate-list
    /// failover on model-not-available (inside [`LlmSwitcher`]), and an
    /// overall wall-clock budget. Callers distinguish
    /// [`LlmError::RateLimited`] to set the session `needs_help` before
    /// falling back — this gateway only classifies
    /// and measures, it does not touch session state.
    pub async fn complete(&self, request: CompletionRequest) -> Result<GatewayReply> {
        let started = Instant::now();
        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            let call = self.switcher.complete(request.clone());
            let outcome = tokio::time::timeout(CALL_BUDGET, call).await;

            let result = match outcome {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout),
            };

            match result {
                Ok(response) => {
                    return Ok(GatewayReply {
                        text: response.text,
                        confidence: response.confidence,
                        latency_ms: started.elapsed().as_millis() as u64,
                        tokens: response.tokens,
                    });
                }
                Err(err) => {
                    if !err.is_retryable() || attempt == self.retry_config.max_retries {
                        return Err(err);
                    }
                    let delay = self.retry_config.delay_for(attempt + 1, err.retry_after());
                    tracing::warn!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %err, "retrying LLM request");
                    tokio::time::sleep(delay).await;
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::Timeout))
    }

    /// The deterministic fallback turn for any unrecoverable LLM failure.
    pub fn fallback_reply(&self) -> GatewayReply {
        GatewayReply { text: FALLBACK_TEXT.to_string(), confidence: 0.0, latency_ms: 0, tokens: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatMessage;
    use crate::mock_client::{MockLlmClient, MockStep};
    use crate::switcher::ClientFactory;
    use std::sync::Arc;

    struct SingleClientFactory(MockLlmClient);
    impl ClientFactory for SingleClientFactory {
        fn create(&self, _model: &str) -> Arc<dyn LlmClient> {
            Arc::new(self.0.clone())
        }
    }

    #[tokio::test]
    async fn successful_completion_reports_latency_and_tokens() {
        let client = MockLlmClient::from_steps("mock", "m0", vec![MockStep::Text("hi there".to_string())]);
        let factory = Arc::new(SingleClientFactory(client));
        let switcher = LlmSwitcher::new(factory, "m0", vec![]);
        let gateway = LlmGateway::new(switcher, LlmRetryConfig::default());

        let reply = gateway
            .complete(CompletionRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap();
        assert_eq!(reply.text, "hi there");
        assert_eq!(reply.confidence, 0.9);
    }

    #[tokio::test]
    async fn rate_limit_propagates_as_error_without_retry_exhaustion_panic() {
        let client = MockLlmClient::from_steps(
            "mock",
            "m0",
            vec![MockStep::RateLimited, MockStep::RateLimited, MockStep::RateLimited],
        );
        let factory = Arc::new(SingleClientFactory(client));
        let switcher = LlmSwitcher::new(factory, "m0", vec![]);
        let gateway = LlmGateway::new(
            switcher,
            LlmRetryConfig { max_retries: 2, initial_delay_ms: 0, max_delay_ms: 0, backoff_multiplier: 1.0 },
        );

        let err = gateway
            .complete(CompletionRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
    }

    #[test]
    fn fallback_reply_has_zero_confidence() {
        let client = MockLlmClient::new("mock", "m0");
        let factory = Arc::new(SingleClientFactory(client));
        let switcher = LlmSwitcher::new(factory, "m0", vec![]);
        let gateway = LlmGateway::new(switcher, LlmRetryConfig::default());
        let reply = gateway.fallback_reply();
        assert_eq!(reply.confidence, 0.0);
        assert_eq!(reply.text, FALLBACK_TEXT);
    }
}
