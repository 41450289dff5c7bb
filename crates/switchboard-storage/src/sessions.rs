use crate::error::Result;
use crate::simple_storage::SimpleStorage;
use crate::{define_simple_storage, error::StoreError};
use switchboard_models::{Session, SessionStatus};

define_simple_storage! {
    /// Typed wrapper over the `sessions` collection.
    pub struct SessionStorage { table: "sessions" }
}

impl SessionStorage {
    pub fn upsert(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_vec(session)?;
        self.put_raw(&session.id, &json)
    }

    pub fn get(&self, id: &str) -> Result<Option<Session>> {
        match self.get_raw(id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> Result<Vec<Session>> {
        self.list_raw()?
            .into_iter()
            .map(|(_, bytes)| Ok(serde_json::from_slice(&bytes)?))
            .collect()
    }

    /// `ensureSession`: creates with `status=active` if
    /// unknown, otherwise updates only `lastSeen` — never overwrites
    /// `userMeta`, keeping repeated calls idempotent.
    pub fn ensure(&self, id: &str, user_meta: serde_json::Value, now: i64) -> Result<Session> {
        if let Some(mut existing) = self.get(id)? {
            existing.last_seen = existing.last_seen.max(now);
            self.upsert(&existing)?;
            return Ok(existing);
        }
        let mut session = Session::new(id, now);
        session.user_meta = user_meta;
        self.upsert(&session)?;
        Ok(session)
    }

    /// `updateSessionStatus`: merges status/lastSeen and the
    /// optional assignment fields. Schema-shape errors are not modeled here
    /// since our own schema always carries the fields — the single-retry-
    /// with-stripping behavior lives in [`crate::gateway::StoreGateway`],
    /// which is the boundary where an external store's rejection would
    /// surface.
    pub fn update_status(
        &self,
        id: &str,
        status: SessionStatus,
        assigned_agent: Option<Option<String>>,
        ai_paused: Option<bool>,
        now: i64,
    ) -> Result<Session> {
        let mut session = self.get(id)?.ok_or(StoreError::NotFound)?;
        if session.status.is_terminal() {
            return Err(StoreError::SchemaShape(
                "cannot mutate a closed session".to_string(),
            ));
        }
        session.status = status;
        session.last_seen = session.last_seen.max(now);
        if let Some(agent) = assigned_agent {
            session.assigned_agent = agent.clone();
            session
                .user_meta
                .as_object_mut()
                .map(|obj| obj.insert("assignedAgent".into(), agent.into()));
        }
        if let Some(paused) = ai_paused {
            session.ai_paused = paused;
            session
                .user_meta
                .as_object_mut()
                .map(|obj| obj.insert("aiPaused".into(), paused.into()));
        }
        self.upsert(&session)?;
        Ok(session)
    }

    /// `assignAgent`: equivalent to
    /// `updateSessionStatus(status=agent_assigned, assignedAgent, aiPaused=true)`.
    /// Rejects assignment onto a closed session.
    pub fn assign_agent(&self, id: &str, agent_id: &str, now: i64) -> Result<Session> {
        let session = self.update_status(
            id,
            SessionStatus::AgentAssigned,
            Some(Some(agent_id.to_string())),
            Some(true),
            now,
        )?;
        debug_assert!(session.upholds_assignment_invariant());
        Ok(session)
    }

    pub fn close(&self, id: &str, now: i64) -> Result<Session> {
        let mut session = self.get(id)?.ok_or(StoreError::NotFound)?;
        session.status = SessionStatus::Closed;
        session.last_seen = session.last_seen.max(now);
        self.upsert(&session)?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn storage() -> (TempDir, SessionStorage) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(redb::Database::create(dir.path().join("t.db")).unwrap());
        let storage = SessionStorage::new(db).unwrap();
        (dir, storage)
    }

    #[test]
    fn ensure_creates_then_only_bumps_last_seen() {
        let (_dir, storage) = storage();
        let first = storage
            .ensure("s-1", serde_json::json!({"locale": "en"}), 100)
            .unwrap();
        assert_eq!(first.start_time, 100);

        let second = storage
            .ensure("s-1", serde_json::json!({"locale": "fr"}), 200)
            .unwrap();
        assert_eq!(second.start_time, 100, "start_time must not regress");
        assert_eq!(second.last_seen, 200);
        assert_eq!(
            second.user_meta,
            serde_json::json!({"locale": "en"}),
            "user_meta must not be overwritten on the update path"
        );
    }

    #[test]
    fn assign_agent_upholds_invariant() {
        let (_dir, storage) = storage();
        storage.ensure("s-1", serde_json::json!({}), 1).unwrap();
        let session = storage.assign_agent("s-1", "a-7", 2).unwrap();
        assert_eq!(session.assigned_agent.as_deref(), Some("a-7"));
        assert!(session.ai_paused);
        assert_eq!(session.status, SessionStatus::AgentAssigned);
    }

    #[test]
    fn assigning_closed_session_is_rejected() {
        let (_dir, storage) = storage();
        storage.ensure("s-1", serde_json::json!({}), 1).unwrap();
        storage.close("s-1", 2).unwrap();
        let result = storage.assign_agent("s-1", "a-7", 3);
        assert!(matches!(result, Err(StoreError::SchemaShape(_))));
    }
}
