use crate::error::Result;
use crate::simple_storage::SimpleStorage;
use crate::{define_simple_storage, error::StoreError};
use switchboard_models::{HealthStatus, LlmSettings};

define_simple_storage! {
    /// Typed wrapper over the `llm_settings` collection.
    pub struct LlmSettingsStorage { table: "llm_settings" }
}

impl LlmSettingsStorage {
    pub fn upsert(&self, settings: &LlmSettings) -> Result<()> {
        let json = serde_json::to_vec(settings)?;
        self.put_raw(&settings.id, &json)
    }

    pub fn get(&self, id: &str) -> Result<Option<LlmSettings>> {
        match self.get_raw(id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> Result<Vec<LlmSettings>> {
        self.list_raw()?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .collect()
    }

    pub fn active(&self) -> Result<Option<LlmSettings>> {
        Ok(self.list()?.into_iter().find(|s| s.is_active))
    }

    /// Activates `id`, deactivating every other configuration, per the
    /// at-most-one-active invariant documented on [`LlmSettings`].
    pub fn activate(&self, id: &str) -> Result<LlmSettings> {
        let mut all = self.list()?;
        if !all.iter().any(|s| s.id == id) {
            return Err(StoreError::NotFound);
        }
        let mut activated = None;
        for settings in &mut all {
            settings.is_active = settings.id == id;
            if settings.is_active {
                activated = Some(settings.clone());
            }
            self.upsert(settings)?;
        }
        Ok(activated.expect("presence checked above"))
    }

    pub fn mark_health(&self, id: &str, status: HealthStatus, last_error: Option<String>) -> Result<LlmSettings> {
        let mut settings = self.get(id)?.ok_or(StoreError::NotFound)?;
        settings.health_status = status;
        settings.last_error = last_error;
        self.upsert(&settings)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn storage() -> (TempDir, LlmSettingsStorage) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(redb::Database::create(dir.path().join("t.db")).unwrap());
        let storage = LlmSettingsStorage::new(db).unwrap();
        (dir, storage)
    }

    fn sample(id: &str) -> LlmSettings {
        LlmSettings {
            id: id.to_string(),
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            encrypted_api_key: vec![1, 2, 3],
            base_url: None,
            is_active: false,
            health_status: HealthStatus::Healthy,
            last_error: None,
        }
    }

    #[test]
    fn activate_deactivates_others() {
        let (_dir, storage) = storage();
        let mut a = sample("a");
        a.is_active = true;
        storage.upsert(&a).unwrap();
        storage.upsert(&sample("b")).unwrap();

        storage.activate("b").unwrap();

        assert!(!storage.get("a").unwrap().unwrap().is_active);
        assert!(storage.get("b").unwrap().unwrap().is_active);
        assert_eq!(storage.active().unwrap().unwrap().id, "b");
    }

    #[test]
    fn activate_unknown_id_is_rejected() {
        let (_dir, storage) = storage();
        let result = storage.activate("missing");
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[test]
    fn mark_health_records_last_error() {
        let (_dir, storage) = storage();
        storage.upsert(&sample("a")).unwrap();
        let updated = storage
            .mark_health("a", HealthStatus::Degraded, Some("timeout".to_string()))
            .unwrap();
        assert_eq!(updated.health_status, HealthStatus::Degraded);
        assert_eq!(updated.last_error.as_deref(), Some("timeout"));
    }
}
