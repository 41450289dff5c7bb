//! Candidate-list model failover and provider health tracking: an
//! automatic "retry same call with next candidate model" strategy, with
//! the active client held behind a create-and-swap lock.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::{CompletionRequest, CompletionResponse, LlmClient};
use crate::error::{LlmError, Result};

/// Builds a fresh [`LlmClient`] for a given model name against the active
/// configuration's provider/credentials. Implemented per-provider by the
/// caller (`switchboard-core`'s config loader), kept generic here so this
/// crate never depends on the persisted `LlmSettings` shape directly.
pub trait ClientFactory: Send + Sync {
    fn create(&self, model: &str) -> Arc<dyn LlmClient>;
}

/// Advisory health of the currently active configuration: healthy/degraded,
/// 3 consecutive successes to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Degraded,
}

const RECOVERY_THRESHOLD: u32 = 3;

struct SwitcherState {
    active: Arc<dyn LlmClient>,
    health: Health,
    last_error: Option<String>,
    consecutive_successes: u32,
}

/// Holds the process-wide active client plus health state, and walks the
/// candidate list on a model-not-available signal.
pub struct LlmSwitcher {
    factory: Arc<dyn ClientFactory>,
    candidates: Vec<String>,
    state: RwLock<SwitcherState>,
}

impl LlmSwitcher {
    pub fn new(factory: Arc<dyn ClientFactory>, initial_model: &str, candidates: Vec<String>) -> Self {
        let active = factory.create(initial_model);
        Self {
            factory,
            candidates,
            state: RwLock::new(SwitcherState {
                active,
                health: Health::Healthy,
                last_error: None,
                consecutive_successes: 0,
            }),
        }
    }

    pub fn current_model(&self) -> String {
        self.state.read().active.model().to_string()
    }

    pub fn health(&self) -> Health {
        self.state.read().health
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    fn record_success(&self) {
        let mut state = self.state.write();
        state.consecutive_successes = state.consecutive_successes.saturating_add(1);
        if state.health == Health::Degraded && state.consecutive_successes >= RECOVERY_THRESHOLD {
            state.health = Health::Healthy;
            state.last_error = None;
        }
    }

    fn record_failure(&self, error: &LlmError) {
        let mut state = self.state.write();
        state.consecutive_successes = 0;
        state.health = Health::Degraded;
        state.last_error = Some(error.to_string());
    }

    fn swap_active(&self, model: &str) -> Arc<dyn LlmClient> {
        let client = self.factory.create(model);
        let mut state = self.state.write();
        state.active = client.clone();
        client
    }

    /// Runs `request` against the active client; on a model-not-available
    /// signal, walks `candidates` in order and swaps the process-wide active
    /// client to the first one that returns a non-empty completion. The
    /// persisted configuration itself is left unchanged.
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let active = self.state.read().active.clone();
        match active.complete(request.clone()).await {
            Ok(response) => {
                self.record_success();
                Ok(response)
            }
            Err(err) if err.is_model_not_available() => {
                tracing::warn!(model = active.model(), "model not available, walking candidate list");
                self.failover(request, &err).await
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    async fn failover(&self, request: CompletionRequest, original: &LlmError) -> Result<CompletionResponse> {
        for candidate in &self.candidates {
            let client = self.factory.create(candidate);
            match client.complete(request.clone()).await {
                Ok(response) if !response.text.is_empty() => {
                    tracing::info!(model = candidate, "failover succeeded, swapping active client");
                    self.swap_active(candidate);
                    self.record_success();
                    return Ok(response);
                }
                Ok(_) => continue,
                Err(err) if err.is_model_not_available() => continue,
                Err(err) => {
                    self.record_failure(&err);
                    return Err(err);
                }
            }
        }
        self.record_failure(original);
        Err(LlmError::NotAvailable { model: "<all candidates exhausted>".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatMessage;
    use crate::mock_client::{MockLlmClient, MockStep};
    use std::collections::HashMap;
    use tokio::sync::Mutex as AsyncMutex;

    struct ScriptedFactory {
        clients: AsyncMutex<HashMap<String, MockLlmClient>>,
    }

    impl ScriptedFactory {
        fn new(clients: HashMap<String, MockLlmClient>) -> Self {
            Self { clients: AsyncMutex::new(clients) }
        }
    }

    impl ClientFactory for ScriptedFactory {
        fn create(&self, model: &str) -> Arc<dyn LlmClient> {
            let clients = self.clients.try_lock().expect("no contention in tests");
            Arc::new(clients.get(model).cloned().unwrap_or_else(|| MockLlmClient::new("mock", model)))
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user("hi")])
    }

    #[tokio::test]
    async fn successful_call_keeps_active_model() {
        let mut clients = HashMap::new();
        clients.insert(
            "m0".to_string(),
            MockLlmClient::from_steps("mock", "m0", vec![MockStep::Text("ok".to_string())]),
        );
        let factory = Arc::new(ScriptedFactory::new(clients));
        let switcher = LlmSwitcher::new(factory, "m0", vec!["m1".to_string()]);

        let response = switcher.complete(request()).await.unwrap();
        assert_eq!(response.text, "ok");
        assert_eq!(switcher.current_model(), "m0");
        assert_eq!(switcher.health(), Health::Healthy);
    }

    #[tokio::test]
    async fn not_available_fails_over_to_next_candidate() {
        let mut clients = HashMap::new();
        clients.insert(
            "m0".to_string(),
            MockLlmClient::from_steps("mock", "m0", vec![MockStep::NotAvailable]),
        );
        clients.insert(
            "m1".to_string(),
            MockLlmClient::from_steps("mock", "m1", vec![MockStep::Text("from m1".to_string())]),
        );
        let factory = Arc::new(ScriptedFactory::new(clients));
        let switcher = LlmSwitcher::new(factory, "m0", vec!["m1".to_string(), "m2".to_string()]);

        let response = switcher.complete(request()).await.unwrap();
        assert_eq!(response.text, "from m1");
        assert_eq!(switcher.current_model(), "m1");
    }

    #[tokio::test]
    async fn rate_limit_does_not_trigger_failover() {
        let mut clients = HashMap::new();
        clients.insert(
            "m0".to_string(),
            MockLlmClient::from_steps("mock", "m0", vec![MockStep::RateLimited]),
        );
        let factory = Arc::new(ScriptedFactory::new(clients));
        let switcher = LlmSwitcher::new(factory, "m0", vec!["m1".to_string()]);

        let err = switcher.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert_eq!(switcher.current_model(), "m0");
        assert_eq!(switcher.health(), Health::Degraded);
    }

    #[tokio::test]
    async fn health_recovers_after_three_consecutive_successes() {
        let mut clients = HashMap::new();
        clients.insert(
            "m0".to_string(),
            MockLlmClient::from_steps(
                "mock",
                "m0",
                vec![
                    MockStep::RateLimited,
                    MockStep::Text("1".to_string()),
                    MockStep::Text("2".to_string()),
                    MockStep::Text("3".to_string()),
                ],
            ),
        );
        let factory = Arc::new(ScriptedFactory::new(clients));
        let switcher = LlmSwitcher::new(factory, "m0", vec![]);

        assert!(switcher.complete(request()).await.is_err());
        assert_eq!(switcher.health(), Health::Degraded);
        for _ in 0..3 {
            switcher.complete(request()).await.unwrap();
        }
        assert_eq!(switcher.health(), Health::Healthy);
        assert!(switcher.last_error().is_none());
    }
}
