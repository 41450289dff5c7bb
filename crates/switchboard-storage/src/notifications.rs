use crate::error::Result;
use crate::simple_storage::SimpleStorage;
use crate::{define_simple_storage, error::StoreError};
use switchboard_models::Notification;

define_simple_storage! {
    /// Typed wrapper over the `notifications` collection backing the
    /// admin feed's `appendNotification`.
    pub struct NotificationStorage { table: "notifications" }
}

impl NotificationStorage {
    pub fn append(&self, notification: &Notification) -> Result<()> {
        let json = serde_json::to_vec(notification)?;
        self.put_raw(&notification.id, &json)
    }

    pub fn append_best_effort(&self, notification: &Notification) {
        if let Err(err) = self.append(notification) {
            tracing::warn!(
                notification_id = %notification.id,
                error = %err,
                "appendNotification failed; continuing best-effort"
            );
        }
    }

    pub fn list_unread(&self) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .list_raw()?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .filter(|n: &Notification| !n.is_read)
            .collect();
        notifications.sort_by_key(|n| n.created_at);
        Ok(notifications)
    }

    pub fn mark_read(&self, id: &str) -> Result<Notification> {
        let bytes = self.get_raw(id)?.ok_or(StoreError::NotFound)?;
        let mut notification: Notification = serde_json::from_slice(&bytes)?;
        notification.is_read = true;
        self.append(&notification)?;
        Ok(notification)
    }
}
