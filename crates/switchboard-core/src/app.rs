//! Process-wide application state: every singleton collaborator the
//! Socket Hub dispatches into, built once at startup and threaded through
//! the router as shared state.

use std::sync::Arc;

use dashmap::DashSet;
use redb::Database;
use switchboard_llm::{LlmGateway, LlmRetryConfig, LlmSwitcher};
use switchboard_models::LlmSettings;
use switchboard_storage::{SecretEncryptor, StoreGateway};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};

use crate::agent_registry::AgentRegistry;
use crate::assignment_cache::AssignmentCache;
use crate::config::Config;
use crate::llm_factory::SettingsClientFactory;
use crate::response_matcher::ResponseMatcher;
use crate::rooms::SessionRooms;
use crate::session_lock::SessionLocks;

pub struct AppCore {
    pub config: Config,
    pub store: StoreGateway,
    pub agents: AgentRegistry,
    pub assignments: AssignmentCache,
    pub matcher: ResponseMatcher,
    pub locks: SessionLocks,
    pub rooms: SessionRooms,
    pub llm: Option<LlmGateway>,
    /// In-memory-only live-visitors snapshot, populated on `visitor_join`:
    /// session ids with an open visitor socket.
    pub live_visitors: DashSet<String>,
}

impl AppCore {
    pub fn build(config: Config) -> anyhow::Result<Self> {
        let db = Arc::new(Database::create(&config.db_path)?);
        let store = StoreGateway::open(db, master_key_encryptor(&config)?, config.redact_pii)?;

        let canned = store.list_canned_responses().unwrap_or_default();
        let matcher = ResponseMatcher::from_responses(&canned);

        let llm = build_llm_gateway(&config, &store)?;

        Ok(Self {
            config,
            store,
            agents: AgentRegistry::new(),
            assignments: AssignmentCache::new(),
            matcher,
            locks: SessionLocks::new(),
            rooms: SessionRooms::new(),
            llm,
            live_visitors: DashSet::new(),
        })
    }
}

/// Resolves the active `llm_settings` row and builds
/// the process-wide gateway. Returns `None` if no configuration is active
/// yet — the routing engine falls back to the deterministic fallback reply
/// in that case rather than failing startup.
fn build_llm_gateway(config: &Config, store: &StoreGateway) -> anyhow::Result<Option<LlmGateway>> {
    let Some(active): Option<LlmSettings> = store.llm_settings.active()? else {
        tracing::warn!("no active LLM configuration; routing will use the deterministic fallback reply");
        return Ok(None);
    };

    let encryptor = master_key_encryptor(config)?;
    let factory = Arc::new(SettingsClientFactory::from_settings(&active, encryptor.as_ref())?);
    let switcher = LlmSwitcher::new(factory, &active.model, config.llm_model_candidates.clone());
    Ok(Some(LlmGateway::new(switcher, LlmRetryConfig::default())))
}

fn master_key_encryptor(config: &Config) -> anyhow::Result<Option<SecretEncryptor>> {
    match &config.master_key_base64 {
        Some(encoded) => {
            let key = BASE64_STANDARD.decode(encoded)?;
            Ok(Some(SecretEncryptor::new(&key)?))
        }
        None => Ok(None),
    }
}
