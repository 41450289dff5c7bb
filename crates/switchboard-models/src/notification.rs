use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of admin-feed notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NeedsHelp,
    AgentOffline,
    SessionStarted,
    AgentJoined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub content: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: i64,
    #[serde(default)]
    pub metadata: Value,
}

impl Notification {
    pub fn new(
        id: impl Into<String>,
        kind: NotificationType,
        content: impl Into<String>,
        session_id: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            content: content.into(),
            session_id: session_id.into(),
            target_user_id: None,
            is_read: false,
            created_at,
            metadata: Value::Object(Default::default()),
        }
    }
}
