//! Per-session hot lookup fronting the Store Gateway,
//! authoritative mirror of a session's assignment fields during a request.
//! Uses the same `dashmap` pattern as the Agent Registry.

use dashmap::DashMap;
use switchboard_storage::StoreGateway;

/// `{agentId, aiPaused}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentEntry {
    pub agent_id: Option<String>,
    pub ai_paused: bool,
}

#[derive(Default)]
pub struct AssignmentCache {
    entries: DashMap<String, AssignmentEntry>,
}

impl AssignmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Option<AssignmentEntry> {
        self.entries.get(session_id).map(|e| e.clone())
    }

    /// Must be called only after the Store Gateway commits an assignment.
    pub fn set(&self, session_id: &str, entry: AssignmentEntry) {
        self.entries.insert(session_id.to_string(), entry);
    }

    pub fn clear(&self, session_id: &str) {
        self.entries.remove(session_id);
    }

    /// On a cache miss, reconstructs the entry from the store: direct
    /// columns first, then `userMeta`, then the `status == agent_assigned`
    /// fallback — the same three-step rule `Session::effective_assignment`
    /// already implements.
    pub fn resolve(&self, store: &StoreGateway, session_id: &str) -> switchboard_storage::Result<Option<AssignmentEntry>> {
        if let Some(cached) = self.get(session_id) {
            return Ok(Some(cached));
        }
        let Some(session) = store.get_session(session_id)? else {
            return Ok(None);
        };
        let (agent_id, ai_paused) = session.effective_assignment();
        let entry = AssignmentEntry { agent_id, ai_paused };
        self.set(session_id, entry.clone());
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use switchboard_models::SessionStatus;
    use tempfile::TempDir;

    fn gateway() -> (TempDir, StoreGateway) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(redb::Database::create(dir.path().join("t.db")).unwrap());
        (dir, StoreGateway::open(db, None, false).unwrap())
    }

    #[test]
    fn miss_resolves_from_store_and_populates_cache() {
        let (_dir, store) = gateway();
        store.ensure_session("s-1", serde_json::json!({}), 1).unwrap();
        store
            .update_session_status("s-1", SessionStatus::AgentAssigned, Some(Some("a-7".to_string())), Some(true), 2)
            .unwrap();

        let cache = AssignmentCache::new();
        let resolved = cache.resolve(&store, "s-1").unwrap().unwrap();
        assert_eq!(resolved.agent_id.as_deref(), Some("a-7"));
        assert!(resolved.ai_paused);
        assert_eq!(cache.get("s-1"), Some(resolved));
    }

    #[test]
    fn unknown_session_resolves_to_none() {
        let (_dir, store) = gateway();
        let cache = AssignmentCache::new();
        assert_eq!(cache.resolve(&store, "missing").unwrap(), None);
    }

    #[test]
    fn clear_forces_a_fresh_resolve() {
        let (_dir, store) = gateway();
        store.ensure_session("s-1", serde_json::json!({}), 1).unwrap();
        let cache = AssignmentCache::new();
        cache.set("s-1", AssignmentEntry { agent_id: Some("a-1".to_string()), ai_paused: true });
        cache.clear("s-1");
        let resolved = cache.resolve(&store, "s-1").unwrap().unwrap();
        assert_eq!(resolved.agent_id, None);
        assert!(!resolved.ai_paused);
    }
}
