use serde::{Deserialize, Serialize};

/// Advisory health of a provider configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// A configured LLM provider+model.
///
/// At most one configuration is active at a time; activating one implicitly
/// deactivates others (enforced by the Store Gateway, not this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub id: String,
    pub provider: String,
    pub model: String,
    /// Ciphertext; decrypted in memory only by the LLM Gateway.
    pub encrypted_api_key: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub is_active: bool,
    pub health_status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
