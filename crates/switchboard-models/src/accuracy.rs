use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a bot turn's reply was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Ai,
    Fallback,
    Stub,
    Preloaded,
}

/// Admin feedback on an AI turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HumanMark {
    Helpful,
    Unhelpful,
    Flagged,
}

const MAX_AI_TEXT_CHARS: usize = 10_000;

/// Per-AI-turn audit row: text, confidence, latency, later feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub ai_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub latency_ms: u64,
    #[serde(default)]
    pub tokens: u32,
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_mark: Option<HumanMark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: i64,
}

impl AccuracyRecord {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        ai_text: impl Into<String>,
        confidence: Option<f32>,
        latency_ms: u64,
        tokens: u32,
        response_type: ResponseType,
        created_at: i64,
    ) -> Self {
        let mut text: String = ai_text.into();
        if text.len() > MAX_AI_TEXT_CHARS {
            // Truncate on a char boundary so multi-byte UTF-8 never panics.
            let cut = text
                .char_indices()
                .take_while(|(idx, _)| *idx < MAX_AI_TEXT_CHARS)
                .last()
                .map(|(idx, ch)| idx + ch.len_utf8())
                .unwrap_or(0);
            text.truncate(cut);
        }
        Self {
            id: id.into(),
            session_id: session_id.into(),
            message_id: None,
            ai_text: text,
            confidence,
            latency_ms,
            tokens,
            response_type,
            human_mark: None,
            evaluation: None,
            metadata: Value::Object(Default::default()),
            created_at,
        }
    }
}

/// Audit row appended when admin feedback mutates `humanMark`/`evaluation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyAudit {
    pub accuracy_id: String,
    pub admin_id: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_overlong_ai_text() {
        let text: String = "x".repeat(MAX_AI_TEXT_CHARS + 500);
        let record = AccuracyRecord::new(
            "r-1",
            "s-1",
            text,
            Some(0.9),
            10,
            0,
            ResponseType::Ai,
            1,
        );
        assert_eq!(record.ai_text.len(), MAX_AI_TEXT_CHARS);
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let text: String = "é".repeat(MAX_AI_TEXT_CHARS);
        let record = AccuracyRecord::new(
            "r-1",
            "s-1",
            text,
            None,
            0,
            0,
            ResponseType::Fallback,
            1,
        );
        assert!(record.ai_text.len() <= MAX_AI_TEXT_CHARS);
        assert!(String::from_utf8(record.ai_text.clone().into_bytes()).is_ok());
    }
}
