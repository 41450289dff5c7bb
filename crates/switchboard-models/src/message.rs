use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    Agent,
    System,
}

/// Free-form per-message metadata: may carry `agentId`, `type`,
/// `attachmentUrl`, or routing tags.
pub type MessageMetadata = Value;

/// An immutable, append-only transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub sender: Sender,
    pub text: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        sender: Sender,
        text: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            sender,
            text: text.into(),
            created_at,
            confidence: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Invariant: confidence is only set when the sender is a bot.
    pub fn upholds_confidence_invariant(&self) -> bool {
        self.sender == Sender::Bot || self.confidence.is_none()
    }

    /// Invariant: agent messages carry `metadata.agentId`.
    pub fn agent_id(&self) -> Option<&str> {
        self.metadata.get("agentId").and_then(Value::as_str)
    }
}
