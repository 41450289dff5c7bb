//! Session rooms and the admin feed. Each session room
//! is exclusively mutated by the Socket Hub;
//! the Routing Engine only ever emits through the [`EventSink`] trait so it
//! stays testable without a live socket.

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::protocol::ServerEvent;

const ROOM_CHANNEL_CAPACITY: usize = 256;

/// Emission surface the Routing Engine depends on. Implemented by
/// [`SessionRooms`] in production, by an in-memory recorder in tests.
pub trait EventSink: Send + Sync {
    fn emit_session(&self, session_id: &str, event: ServerEvent);
    fn emit_admin(&self, event: ServerEvent);
}

/// `sessionId -> broadcast::Sender<ServerEvent>`, created lazily on first
/// join, using the same lazily-populated map pattern as the Agent
/// Registry and Assignment Cache.
pub struct SessionRooms {
    rooms: DashMap<String, broadcast::Sender<ServerEvent>>,
    admin_feed: broadcast::Sender<ServerEvent>,
}

impl Default for SessionRooms {
    fn default() -> Self {
        let (admin_feed, _) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
        Self { rooms: DashMap::new(), admin_feed }
    }
}

impl SessionRooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `sessionId`'s room, creating it if this is the first
    /// member.
    pub fn join(&self, session_id: &str) -> broadcast::Receiver<ServerEvent> {
        self.rooms
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn join_admin_feed(&self) -> broadcast::Receiver<ServerEvent> {
        self.admin_feed.subscribe()
    }
}

impl EventSink for SessionRooms {
    /// No-op if the room has no subscribers (visitor already disconnected);
    /// `broadcast::Sender::send` failing with no receivers is not an error.
    fn emit_session(&self, session_id: &str, event: ServerEvent) {
        if let Some(sender) = self.rooms.get(session_id) {
            let _ = sender.send(event);
        }
    }

    fn emit_admin(&self, event: ServerEvent) {
        let _ = self.admin_feed.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_creates_room_on_demand_and_delivers_events() {
        let rooms = SessionRooms::new();
        let mut receiver = rooms.join("s-1");
        rooms.emit_session("s-1", ServerEvent::ConversationClosed { session_id: "s-1".to_string() });
        let event = receiver.try_recv().unwrap();
        assert!(matches!(event, ServerEvent::ConversationClosed { .. }));
    }

    #[test]
    fn emit_to_unjoined_session_does_not_panic() {
        let rooms = SessionRooms::new();
        rooms.emit_session("nobody-here", ServerEvent::AgentSuperseded);
    }

    #[test]
    fn admin_feed_is_independent_of_session_rooms() {
        let rooms = SessionRooms::new();
        let mut admin_rx = rooms.join_admin_feed();
        rooms.emit_admin(ServerEvent::AgentSuperseded);
        assert!(admin_rx.try_recv().is_ok());
    }
}
