//! Wire-level socket protocol: a closed tagged union per direction,
//! validated on the edge. A single `serde(tag = "event")` enum per
//! direction, since every frame here rides the same bidirectional
//! connection rather than separate channel types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames accepted from a visitor or agent socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    StartSession {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        user_meta: Option<Value>,
    },
    UserMessage {
        session_id: String,
        text: String,
    },
    TypingStart {
        session_id: String,
    },
    TypingStop {
        session_id: String,
    },
    RequestAgent {
        session_id: String,
    },
    VisitorJoin {
        session_id: String,
    },
    JoinSession {
        session_id: String,
    },
    JoinAdminFeed,
    AgentAuth {
        token: String,
        #[serde(default)]
        agent_id: Option<String>,
    },
    AgentTakeover {
        session_id: String,
        agent_id: String,
    },
    AgentMessage {
        session_id: String,
        text: String,
        agent_id: String,
    },
}

/// Frames emitted to a visitor or agent socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    SessionStarted {
        session_id: String,
    },
    BotMessage {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f32>,
    },
    UserMessage {
        text: String,
        sender: &'static str,
        ts: i64,
    },
    UserMessageForAgent {
        session_id: String,
        text: String,
        ts: i64,
    },
    AgentMessage {
        text: String,
        agent_id: String,
        sender: &'static str,
        ts: i64,
    },
    AgentJoined {
        agent_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_name: Option<String>,
    },
    DisplayTyping {
        user: String,
        is_typing: bool,
    },
    SessionError {
        error: String,
    },
    AuthSuccess {
        user: AuthenticatedUser,
    },
    AuthError {
        message: String,
    },
    Assignment {
        #[serde(rename = "type")]
        kind: &'static str,
        session_id: String,
    },
    ConversationClosed {
        session_id: String,
    },
    NewNotification {
        #[serde(flatten)]
        notification: Value,
    },
    LiveVisitorsUpdate {
        visitors: Vec<String>,
    },
    AgentSuperseded,
}

/// Principal shape embedded in `auth_success`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}
