//! Builds the process's [`switchboard_llm::LlmGateway`] from the active
//! `llm_settings` row: resolve the active configuration, decrypt the key
//! in memory only. Bridges `switchboard-storage`'s
//! persisted `LlmSettings` to `switchboard-llm`'s provider-agnostic
//! `ClientFactory` trait.

use std::sync::Arc;

use switchboard_llm::{AnthropicCompatibleClient, ClientFactory, LlmClient, OpenAiCompatibleClient};
use switchboard_models::LlmSettings;
use switchboard_storage::SecretEncryptor;

/// Creates a provider client for a given model name against one fixed
/// provider/credentials pair — the active configuration at the time the
/// gateway was built. Model failover only ever walks
/// model names within this same provider; switching providers entirely
/// requires an admin re-activation, which rebuilds the gateway.
pub struct SettingsClientFactory {
    provider: String,
    api_key: String,
    base_url: Option<String>,
}

impl SettingsClientFactory {
    pub fn from_settings(settings: &LlmSettings, encryptor: Option<&SecretEncryptor>) -> anyhow::Result<Self> {
        let api_key = match encryptor {
            Some(encryptor) => String::from_utf8(encryptor.decrypt(&settings.encrypted_api_key)?)?,
            None => String::from_utf8(settings.encrypted_api_key.clone())?,
        };
        Ok(Self {
            provider: settings.provider.clone(),
            api_key,
            base_url: settings.base_url.clone(),
        })
    }
}

impl ClientFactory for SettingsClientFactory {
    fn create(&self, model: &str) -> Arc<dyn LlmClient> {
        match self.provider.as_str() {
            "anthropic" => {
                let mut client = AnthropicCompatibleClient::new(self.api_key.clone(), model.to_string());
                if let Some(base_url) = &self.base_url {
                    client = client.with_base_url(base_url.clone());
                }
                Arc::new(client)
            }
            // Every other configured provider name (openai, groq,
            // openrouter, local vLLM/Ollama gateways,...) speaks the same
            // OpenAI-compatible `/chat/completions` shape.
            _ => {
                let mut client = OpenAiCompatibleClient::new(self.api_key.clone(), model.to_string());
                if let Some(base_url) = &self.base_url {
                    client = client.with_base_url(base_url.clone());
                }
                Arc::new(client)
            }
        }
    }
}
