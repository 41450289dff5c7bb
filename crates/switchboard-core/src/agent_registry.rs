//! Process-wide map from agent identifier to live socket handle, plus
//! presence lookup: at most one live handle per agent id, a new auth
//! supersedes the old handle.

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::ServerEvent;

/// A live agent socket's outbound channel. Sending fails silently if the
/// receiving task has already dropped (socket closed); callers treat that
/// the same as `send` returning `false`.
pub type AgentHandle = UnboundedSender<ServerEvent>;

/// `agentId -> connectionHandle`. There is no
/// reverse map: the handle itself does not need to look up its own id, and
/// `unbind` is always called with the id known by the caller (the socket
/// task that owns it).
#[derive(Default)]
pub struct AgentRegistry {
    agents: DashMap<String, AgentHandle>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `agentId` to `handle`. If a prior handle exists, it is sent
    /// `agent_superseded` and evicted before the new one takes its place.
    pub fn bind(&self, agent_id: &str, handle: AgentHandle) {
        if let Some(prior) = self.agents.insert(agent_id.to_string(), handle) {
            let _ = prior.send(ServerEvent::AgentSuperseded);
            tracing::info!(agent_id, "agent handle superseded by new auth");
        }
    }

    /// Removes the binding for `agentId` iff `handle` is still the one on
    /// file (so a stale disconnect doesn't unbind a handle that superseded
    /// it in the meantime).
    pub fn unbind(&self, agent_id: &str, handle: &AgentHandle) {
        let removed = self
            .agents
            .remove_if(agent_id, |_, current| current.same_channel(handle));
        if removed.is_some() {
            tracing::info!(agent_id, "agent presence lost");
        }
    }

    /// Delivers `event` to `agentId`'s live handle. Returns `true` iff a
    /// live handle accepted the send; no queueing.
    pub fn send(&self, agent_id: &str, event: ServerEvent) -> bool {
        match self.agents.get(agent_id) {
            Some(handle) => handle.send(event).is_ok(),
            None => false,
        }
    }

    pub fn presence(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn bind_then_presence_is_true() {
        let registry = AgentRegistry::new();
        let (tx, _rx) = unbounded_channel();
        registry.bind("a-7", tx);
        assert!(registry.presence("a-7"));
    }

    #[test]
    fn rebinding_supersedes_prior_handle() {
        let registry = AgentRegistry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();
        registry.bind("a-7", tx1);
        registry.bind("a-7", tx2);

        let event = rx1.try_recv().expect("prior handle notified");
        assert!(matches!(event, ServerEvent::AgentSuperseded));
        assert!(registry.presence("a-7"));
    }

    #[test]
    fn send_returns_false_when_agent_offline() {
        let registry = AgentRegistry::new();
        assert!(!registry.send("a-9", ServerEvent::AgentSuperseded));
    }

    #[test]
    fn unbind_removes_mapping() {
        let registry = AgentRegistry::new();
        let (tx, _rx) = unbounded_channel();
        registry.bind("a-7", tx.clone());
        registry.unbind("a-7", &tx);
        assert!(!registry.presence("a-7"));
    }

    #[test]
    fn stale_unbind_does_not_remove_superseding_handle() {
        let registry = AgentRegistry::new();
        let (tx1, _rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();
        registry.bind("a-7", tx1.clone());
        registry.bind("a-7", tx2);
        registry.unbind("a-7", &tx1);
        assert!(registry.presence("a-7"));
    }
}
