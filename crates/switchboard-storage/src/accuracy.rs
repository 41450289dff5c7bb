use crate::error::Result;
use crate::simple_storage::SimpleStorage;
use crate::{define_simple_storage, error::StoreError};
use switchboard_models::{AccuracyAudit, AccuracyRecord, HumanMark};

define_simple_storage! {
    /// Typed wrapper over the `accuracy_records` collection.
    pub struct AccuracyStorage { table: "accuracy_records" }
}

impl AccuracyStorage {
    /// `saveAccuracyRecord`.
    pub fn save(&self, record: &AccuracyRecord) -> Result<()> {
        let json = serde_json::to_vec(record)?;
        self.put_raw(&record.id, &json)
    }

    pub fn get(&self, id: &str) -> Result<Option<AccuracyRecord>> {
        match self.get_raw(id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list_for_session(&self, session_id: &str) -> Result<Vec<AccuracyRecord>> {
        let mut records: Vec<AccuracyRecord> = self
            .list_raw()?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .filter(|r: &AccuracyRecord| r.session_id == session_id)
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    /// Admin feedback write: sets `humanMark`/`evaluation` on an existing
    /// record and appends an [`AccuracyAudit`] row, never mutating the
    /// original AI text.
    pub fn apply_feedback(
        &self,
        id: &str,
        admin_id: &str,
        human_mark: Option<HumanMark>,
        evaluation: Option<String>,
        note: Option<String>,
        now: i64,
    ) -> Result<(AccuracyRecord, AccuracyAudit)> {
        let mut record = self.get(id)?.ok_or(StoreError::NotFound)?;
        if let Some(mark) = human_mark {
            record.human_mark = Some(mark);
        }
        if let Some(evaluation) = evaluation {
            record.evaluation = Some(evaluation);
        }
        self.save(&record)?;

        let audit = AccuracyAudit {
            accuracy_id: id.to_string(),
            admin_id: admin_id.to_string(),
            action: "feedback".to_string(),
            note,
            ts: now,
        };
        Ok((record, audit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use switchboard_models::ResponseType;
    use tempfile::TempDir;

    fn storage() -> (TempDir, AccuracyStorage) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(redb::Database::create(dir.path().join("t.db")).unwrap());
        let storage = AccuracyStorage::new(db).unwrap();
        (dir, storage)
    }

    #[test]
    fn save_and_get_roundtrip() {
        let (_dir, storage) = storage();
        let record = AccuracyRecord::new("r-1", "s-1", "hi", Some(0.9), 10, 0, ResponseType::Ai, 1);
        storage.save(&record).unwrap();
        let fetched = storage.get("r-1").unwrap().unwrap();
        assert_eq!(fetched.ai_text, "hi");
    }

    #[test]
    fn list_for_session_filters_and_orders() {
        let (_dir, storage) = storage();
        storage
            .save(&AccuracyRecord::new("r-1", "s-1", "a", None, 0, 0, ResponseType::Ai, 20))
            .unwrap();
        storage
            .save(&AccuracyRecord::new("r-2", "s-1", "b", None, 0, 0, ResponseType::Ai, 10))
            .unwrap();
        storage
            .save(&AccuracyRecord::new("r-3", "s-2", "c", None, 0, 0, ResponseType::Ai, 5))
            .unwrap();

        let records = storage.list_for_session("s-1").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "r-2");
        assert_eq!(records[1].id, "r-1");
    }

    #[test]
    fn apply_feedback_sets_mark_and_returns_audit() {
        let (_dir, storage) = storage();
        storage
            .save(&AccuracyRecord::new("r-1", "s-1", "a", None, 0, 0, ResponseType::Ai, 1))
            .unwrap();
        let (record, audit) = storage
            .apply_feedback(
                "r-1",
                "admin-1",
                Some(HumanMark::Helpful),
                None,
                Some("looks good".to_string()),
                100,
            )
                .unwrap();
        assert_eq!(record.human_mark, Some(HumanMark::Helpful));
        assert_eq!(audit.accuracy_id, "r-1");
        assert_eq!(audit.admin_id, "admin-1");
    }
}
