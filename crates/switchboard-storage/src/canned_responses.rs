use crate::error::Result;
use crate::simple_storage::SimpleStorage;
use crate::{define_simple_storage, error::StoreError};
use switchboard_models::PreloadedResponse;

define_simple_storage! {
    /// Typed wrapper over the `canned_responses` collection. Keyed by
    /// `pattern`, which is operator-curated and unique; exact content and
    /// ordering are deployment configuration.
    pub struct CannedResponseStorage { table: "canned_responses" }
}

impl CannedResponseStorage {
    pub fn upsert(&self, response: &PreloadedResponse) -> Result<()> {
        let json = serde_json::to_vec(response)?;
        self.put_raw(&response.pattern, &json)
    }

    pub fn get(&self, pattern: &str) -> Result<Option<PreloadedResponse>> {
        match self.get_raw(pattern)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, pattern: &str) -> Result<bool> {
        SimpleStorage::delete(self, pattern)
    }

    /// `listCannedResponses`: all entries, in insertion order
    /// as returned by the store, for the Response Matcher to scan.
    pub fn list(&self) -> Result<Vec<PreloadedResponse>> {
        self.list_raw()?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use switchboard_models::MatchType;
    use tempfile::TempDir;

    fn storage() -> (TempDir, CannedResponseStorage) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(redb::Database::create(dir.path().join("t.db")).unwrap());
        let storage = CannedResponseStorage::new(db).unwrap();
        (dir, storage)
    }

    #[test]
    fn upsert_and_list_roundtrip() {
        let (_dir, storage) = storage();
        storage
            .upsert(&PreloadedResponse::new("hours", MatchType::Exact, "9-5"))
            .unwrap();
        storage
            .upsert(&PreloadedResponse::new("/ban", MatchType::Shortcut, "banned"))
            .unwrap();

        let all = storage.list().unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn delete_removes_entry() {
        let (_dir, storage) = storage();
        storage
            .upsert(&PreloadedResponse::new("hours", MatchType::Exact, "9-5"))
            .unwrap();
        assert!(storage.delete("hours").unwrap());
        assert!(storage.get("hours").unwrap().is_none());
    }
}
