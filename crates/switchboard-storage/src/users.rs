use crate::error::Result;
use crate::simple_storage::SimpleStorage;
use crate::{define_simple_storage, error::StoreError};
use switchboard_models::User;

define_simple_storage! {
    /// Typed wrapper over the `users` collection, keyed by `userId`. Backs
    /// the principal lookup in the auth contract.
    pub struct UserStorage { table: "users" }
}

impl UserStorage {
    pub fn upsert(&self, user: &User) -> Result<()> {
        let json = serde_json::to_vec(user)?;
        self.put_raw(&user.user_id, &json)
    }

    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        match self.get_raw(user_id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        for (_, bytes) in self.list_raw()? {
            let user: User = serde_json::from_slice(&bytes)?;
            if user.email == email {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    pub fn list(&self) -> Result<Vec<User>> {
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
    use switchboard_models::AccountStatus;
    use tempfile::TempDir;

    fn storage() -> (TempDir, UserStorage) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(redb::Database::create(dir.path().join("t.db")).unwrap());
        let storage = UserStorage::new(db).unwrap();
        (dir, storage)
    }

    fn sample_user(id: &str, email: &str) -> User {
        User {
            user_id: id.to_string(),
            email: email.to_string(),
            name: "Agent Smith".to_string(),
            roles: vec!["agent".to_string()],
            account_status: AccountStatus::Active,
            permissions: vec![],
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn get_by_email_finds_user() {
        let (_dir, storage) = storage();
        storage.upsert(&sample_user("u-1", "a@example.com")).unwrap();
        let found = storage.get_by_email("a@example.com").unwrap().unwrap();
        assert_eq!(found.user_id, "u-1");
    }

    #[test]
    fn get_by_email_returns_none_for_unknown() {
        let (_dir, storage) = storage();
        assert!(storage.get_by_email("nobody@example.com").unwrap().is_none());
    }
}
