//! Recognized configuration: a `switchboard.toml` file wins
//! if present, otherwise every option falls back to a `SWITCHBOARD_`-
//! prefixed environment variable.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub master_key_base64: Option<String>,
    pub redact_pii: bool,
    pub admin_shared_secrets: Vec<String>,
    pub jwt_secret: Option<String>,
    pub export_rate_limit_window_secs: u64,
    pub export_rate_limit_max: u32,
    pub llm_history_limit: usize,
    pub llm_model_candidates: Vec<String>,
    pub welcome_message: String,
    pub system_prompt: String,
    pub image_analysis_prompt: String,
}

impl Config {
    /// Sane defaults for tests and for a first local run with no
    /// configuration present at all.
    pub fn defaults() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            master_key_base64: None,
            redact_pii: false,
            admin_shared_secrets: Vec::new(),
            jwt_secret: None,
            export_rate_limit_window_secs: 60,
            export_rate_limit_max: 5,
            llm_history_limit: default_history_limit(),
            llm_model_candidates: Vec::new(),
            welcome_message: default_welcome_message(),
            system_prompt: default_system_prompt(),
            image_analysis_prompt: default_image_analysis_prompt(),
        }
    }

    /// `switchboard.toml` (or `SWITCHBOARD_CONFIG`-named file) if present,
    /// else environment variables.
    pub fn load() -> anyhow::Result<Self> {
        if let Some(file_config) = load_from_file()? {
            return Ok(file_config.into_config());
        }
        Ok(Self::from_env())
    }

    fn from_env() -> Self {
        let defaults = Self::defaults();
        Self {
            host: env::var("SWITCHBOARD_HOST").unwrap_or(defaults.host),
            port: env::var("SWITCHBOARD_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.port),
            db_path: env::var("SWITCHBOARD_DB_PATH").unwrap_or(defaults.db_path),
            master_key_base64: env::var("SWITCHBOARD_MASTER_KEY").ok(),
            redact_pii: env::var("SWITCHBOARD_REDACT_PII").ok().and_then(|v| v.parse().ok()).unwrap_or(false),
            admin_shared_secrets: env::var("SWITCHBOARD_ADMIN_SECRETS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or_default(),
            jwt_secret: env::var("SWITCHBOARD_JWT_SECRET").ok(),
            export_rate_limit_window_secs: env::var("SWITCHBOARD_EXPORT_RATE_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.export_rate_limit_window_secs),
            export_rate_limit_max: env::var("SWITCHBOARD_EXPORT_RATE_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.export_rate_limit_max),
            llm_history_limit: env::var("SWITCHBOARD_LLM_HISTORY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.llm_history_limit),
            llm_model_candidates: env::var("SWITCHBOARD_LLM_MODEL_CANDIDATES")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or(defaults.llm_model_candidates),
            welcome_message: env::var("SWITCHBOARD_WELCOME_MESSAGE").unwrap_or(defaults.welcome_message),
            system_prompt: env::var("SWITCHBOARD_SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
            image_analysis_prompt: env::var("SWITCHBOARD_IMAGE_PROMPT").unwrap_or(defaults.image_analysis_prompt),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_db_path() -> String {
    "switchboard.redb".to_string()
}

fn default_history_limit() -> usize {
    20
}

fn default_welcome_message() -> String {
    "Hi! How can I help you today?".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful support assistant. Answer concisely and accurately.".to_string()
}

fn default_image_analysis_prompt() -> String {
    "Describe the contents of this image for a support agent.".to_string()
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    auth: AuthSection,
    #[serde(default)]
    export: ExportSection,
    #[serde(default)]
    llm: LlmSection,
    #[serde(default)]
    text: TextSection,
}

impl FileConfig {
    fn into_config(self) -> Config {
        let defaults = Config::defaults();
        Config {
            host: self.server.host,
            port: self.server.port,
            db_path: self.store.db_path,
            master_key_base64: self.store.master_key_base64,
            redact_pii: self.store.redact_pii,
            admin_shared_secrets: self.auth.admin_shared_secrets,
            jwt_secret: self.auth.jwt_secret,
            export_rate_limit_window_secs: self.export.rate_limit_window_secs,
            export_rate_limit_max: self.export.rate_limit_max,
            llm_history_limit: self.llm.history_limit,
            llm_model_candidates: self.llm.model_candidates,
            welcome_message: self.text.welcome_message.unwrap_or(defaults.welcome_message),
            system_prompt: self.text.system_prompt.unwrap_or(defaults.system_prompt),
            image_analysis_prompt: self.text.image_analysis_prompt.unwrap_or(defaults.image_analysis_prompt),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Deserialize)]
struct StoreSection {
    #[serde(default = "default_db_path")]
    db_path: String,
    #[serde(default)]
    master_key_base64: Option<String>,
    #[serde(default)]
    redact_pii: bool,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self { db_path: default_db_path(), master_key_base64: None, redact_pii: false }
    }
}

#[derive(Debug, Deserialize, Default)]
struct AuthSection {
    #[serde(default)]
    admin_shared_secrets: Vec<String>,
    #[serde(default)]
    jwt_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExportSection {
    #[serde(default = "default_export_window")]
    rate_limit_window_secs: u64,
    #[serde(default = "default_export_max")]
    rate_limit_max: u32,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self { rate_limit_window_secs: default_export_window(), rate_limit_max: default_export_max() }
    }
}

fn default_export_window() -> u64 {
    60
}

fn default_export_max() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
struct LlmSection {
    #[serde(default = "default_history_limit")]
    history_limit: usize,
    #[serde(default)]
    model_candidates: Vec<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self { history_limit: default_history_limit(), model_candidates: Vec::new() }
    }
}

#[derive(Debug, Deserialize, Default)]
struct TextSection {
    #[serde(default)]
    welcome_message: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    image_analysis_prompt: Option<String>,
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let configured_path = env::var("SWITCHBOARD_CONFIG").ok();
    let path = if let Some(path) = configured_path {
        Some(path)
    } else if Path::new("switchboard.toml").exists() {
        Some("switchboard.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path).map_err(|err| anyhow::anyhow!("failed to read config {path}: {err}"))?;
    let parsed: FileConfig =
        toml::from_str(&contents).map_err(|err| anyhow::anyhow!("failed to parse config {path}: {err}"))?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = Config::defaults();
        assert_eq!(config.port, 8787);
        assert!(config.admin_shared_secrets.is_empty());
    }

    #[test]
    fn file_config_parses_minimal_toml() {
        let toml_text = r#"
            [server]
            port = 9000

            [auth]
            admin_shared_secrets = ["dev-secret"]
        "#;
        let parsed: FileConfig = toml::from_str(toml_text).unwrap();
        let config = parsed.into_config();
        assert_eq!(config.port, 9000);
        assert_eq!(config.admin_shared_secrets, vec!["dev-secret".to_string()]);
        assert_eq!(config.llm_history_limit, default_history_limit());
    }
}
