use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    AgentAssigned,
    NeedsHuman,
    Closed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Closed)
    }
}

/// A continuous conversation between a visitor, an optional agent, and the AI.
///
/// `assigned_agent` and `ai_paused` are the direct columns; `user_meta` is
/// a compatibility fallback — some stores lack
/// the direct columns, in which case the same facts are mirrored into
/// `user_meta["assignedAgent"]` / `user_meta["aiPaused"]`. Readers must
/// consult the direct column first and fall back to `user_meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    #[serde(default)]
    pub ai_paused: bool,
    pub start_time: i64,
    pub last_seen: i64,
    #[serde(default)]
    pub user_meta: Value,
    #[serde(default)]
    pub theme: Value,
}

impl Session {
    pub fn new(id: impl Into<String>, now: i64) -> Self {
        Self {
            id: id.into(),
            status: SessionStatus::Active,
            assigned_agent: None,
            ai_paused: false,
            start_time: now,
            last_seen: now,
            user_meta: Value::Object(Default::default()),
            theme: Value::Null,
        }
    }

    /// Resolve the effective assignment, preferring direct columns and
    /// falling back to `user_meta`.
    pub fn effective_assignment(&self) -> (Option<String>, bool) {
        if self.assigned_agent.is_some() || self.ai_paused {
            return (self.assigned_agent.clone(), self.ai_paused);
        }
        let meta_agent = self
            .user_meta
            .get("assignedAgent")
            .and_then(Value::as_str)
            .map(str::to_string);
        let meta_paused = self
            .user_meta
            .get("aiPaused")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if meta_agent.is_some() || meta_paused {
            return (meta_agent, meta_paused);
        }
        // Invariant: status = agent_assigned implies aiPaused = true even
        // when no agent id is recorded anywhere.
        if self.status == SessionStatus::AgentAssigned {
            return (None, true);
        }
        (None, false)
    }

    /// Invariant: an assigned agent implies the AI side is paused.
    pub fn upholds_assignment_invariant(&self) -> bool {
        let (agent, paused) = self.effective_assignment();
        if agent.is_some() && !paused {
            return false;
        }
        if agent.is_some() && !matches!(self.status, SessionStatus::AgentAssigned | SessionStatus::Closed) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_active_and_unassigned() {
        let session = Session::new("s-1", 1_000);
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.effective_assignment(), (None, false));
        assert!(session.upholds_assignment_invariant());
    }

    #[test]
    fn direct_columns_take_precedence_over_user_meta() {
        let mut session = Session::new("s-1", 1_000);
        session.user_meta = serde_json::json!({"assignedAgent": "a-stale", "aiPaused": true});
        session.assigned_agent = Some("a-7".to_string());
        session.ai_paused = true;
        assert_eq!(
            session.effective_assignment(),
            (Some("a-7".to_string()), true)
        );
    }

    #[test]
    fn falls_back_to_user_meta_when_columns_absent() {
        let mut session = Session::new("s-1", 1_000);
        session.user_meta = serde_json::json!({"assignedAgent": "a-9", "aiPaused": true});
        assert_eq!(
            session.effective_assignment(),
            (Some("a-9".to_string()), true)
        );
    }

    #[test]
    fn agent_assigned_status_implies_paused_even_without_agent_id() {
        let mut session = Session::new("s-1", 1_000);
        session.status = SessionStatus::AgentAssigned;
        assert_eq!(session.effective_assignment(), (None, true));
    }

    #[test]
    fn detects_broken_invariant() {
        let mut session = Session::new("s-1", 1_000);
        session.assigned_agent = Some("a-7".to_string());
        session.ai_paused = false;
        assert!(!session.upholds_assignment_invariant());
    }
}
