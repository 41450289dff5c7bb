//! Writes per-AI-turn accuracy records and serves admin feedback mutation.
//! Thin wrapper delegating to the Store Gateway's accuracy methods, with
//! an explicit audit-row append on every feedback mutation.

use switchboard_models::{AccuracyRecord, HumanMark, ResponseType};
use switchboard_storage::StoreGateway;

pub struct AccuracyRecorder<'a> {
    store: &'a StoreGateway,
}

impl<'a> AccuracyRecorder<'a> {
    pub fn new(store: &'a StoreGateway) -> Self {
        Self { store }
    }

    /// Records one `bot` turn. Writes are best-effort: failure is logged,
    /// never surfaced to the visitor.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        id: &str,
        session_id: &str,
        message_id: Option<&str>,
        ai_text: &str,
        confidence: Option<f32>,
        latency_ms: u64,
        tokens: u32,
        response_type: ResponseType,
        now: i64,
    ) {
        let mut record =
            AccuracyRecord::new(id, session_id, ai_text, confidence, latency_ms, tokens, response_type, now);
        record.message_id = message_id.map(str::to_string);
        if let Err(err) = self.store.save_accuracy_record(&record) {
            tracing::warn!(session_id, error = %err, "accuracy record write failed; continuing best-effort");
        }
    }

    /// `POST /accuracy/:id/feedback`: mutates only
    /// `humanMark`/`evaluation`, appends an audit row.
    pub fn apply_feedback(
        &self,
        accuracy_id: &str,
        admin_id: &str,
        human_mark: Option<HumanMark>,
        evaluation: Option<String>,
        note: Option<String>,
        now: i64,
    ) -> switchboard_storage::Result<AccuracyRecord> {
        self.store
            .apply_accuracy_feedback(accuracy_id, admin_id, human_mark, evaluation, note, now)
    }
}
