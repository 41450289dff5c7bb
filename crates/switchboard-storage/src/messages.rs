use crate::encryption::SecretEncryptor;
use crate::error::Result;
use crate::simple_storage::{SimpleStorage, MAX_BOUNDED_SCAN};
use crate::{define_simple_storage, error::StoreError};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use redb::{ReadableDatabase, ReadableTable};
use switchboard_models::{Message, MessageMetadata, Sender};

define_simple_storage! {
    /// Typed wrapper over the `messages` collection.
    ///
    /// Keys are `"{sessionId}:{createdAt:020}:{id}"` so a lexicographic
    /// range scan over the `sessionId` prefix yields ascending-time order
    /// without a secondary index — a typed query builder layered over a
    /// store that otherwise lacks rich query support.
    pub struct MessageStorage { table: "messages" }
}

/// Either plaintext (`ciphertext = None`) or an AES-256-GCM encrypted
/// payload, mirroring `encrypted` / `encrypted_metadata` columns.
/// Plaintext columns may be redacted once encrypted, per the
/// redact-PII configuration flag.
pub struct StoredMessage {
    pub message: Message,
    pub encrypted_text: Option<Vec<u8>>,
    pub encrypted_metadata: Option<Vec<u8>>,
    pub redacted: bool,
}

fn message_key(session_id: &str, created_at: i64, id: &str) -> String {
    // Shift into a non-negative range so lexicographic string order matches
    // numeric order even for (hypothetical) negative timestamps.
    let shifted = created_at.wrapping_add(i64::MAX / 2) as u64;
    format!("{session_id}:{shifted:020}:{id}")
}

fn session_prefix_range(session_id: &str) -> (String, String) {
    let start = format!("{session_id}:");
    // ';' (0x3B) is the next byte after ':' (0x3A) in ASCII, giving a tight
    // exclusive upper bound for the prefix scan.
    let end = format!("{session_id};");
    (start, end)
}

impl MessageStorage {
    pub fn append(
        &self,
        id: &str,
        session_id: &str,
        sender: Sender,
        text: &str,
        metadata: MessageMetadata,
        created_at: i64,
        confidence: Option<f32>,
        encryptor: Option<&SecretEncryptor>,
        redact_pii: bool,
    ) -> Result<Message> {
        let mut message = Message::new(id, session_id, sender, text, created_at);
        message.metadata = metadata;
        if let Some(confidence) = confidence {
            message = message.with_confidence(confidence);
        }

        if let Some(encryptor) = encryptor {
            let ciphertext = encryptor.encrypt(message.text.as_bytes())?;
            let metadata_bytes = serde_json::to_vec(&message.metadata)?;
            let encrypted_metadata = encryptor.encrypt(&metadata_bytes)?;
            let encrypted = BASE64_STANDARD.encode(&ciphertext);
            let encrypted_metadata = BASE64_STANDARD.encode(&encrypted_metadata);

            if redact_pii {
                // Plaintext columns are cleared, but the ciphertext columns
                // themselves must survive — they are the only way back to
                // the plaintext.
                message.metadata = serde_json::json!({
                    "encrypted": encrypted,
                    "encryptedMetadata": encrypted_metadata,
                });
                message.text = String::new();
            } else if let Some(obj) = message.metadata.as_object_mut() {
                obj.insert("encrypted".into(), encrypted.into());
                obj.insert("encryptedMetadata".into(), encrypted_metadata.into());
            }
        }

        let key = message_key(session_id, created_at, id);
        let json = serde_json::to_vec(&message)?;
        self.put_raw(&key, &json)?;
        Ok(message)
    }

    /// Best-effort append used by the routing hot path: a
    /// failed append is logged while the in-memory fan-out still
    /// proceeds. Never propagates a store error to the caller; it logs
    /// and returns `None` on failure.
    #[allow(clippy::too_many_arguments)]
    pub fn append_best_effort(
        &self,
        id: &str,
        session_id: &str,
        sender: Sender,
        text: &str,
        metadata: MessageMetadata,
        created_at: i64,
        confidence: Option<f32>,
        encryptor: Option<&SecretEncryptor>,
        redact_pii: bool,
    ) -> Option<Message> {
        match self.append(
            id,
            session_id,
            sender,
            text,
            metadata,
            created_at,
            confidence,
            encryptor,
            redact_pii,
        ) {
            Ok(message) => Some(message),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "appendMessage failed; continuing best-effort");
                None
            }
        }
    }

    /// `listMessages(sessionId, {order, limit, offset})`.
    pub fn list(
        &self,
        session_id: &str,
        ascending: bool,
        limit: usize,
        offset: usize,
        encryptor: Option<&SecretEncryptor>,
    ) -> Result<Vec<Message>> {
        let (start, end) = session_prefix_range(session_id);
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;

        let mut rows = Vec::new();
        for item in table.range::<&str>(start.as_str()..end.as_str())? {
            let (_, value) = item?;
            rows.push(value.value().to_vec());
        }
        drop(table);
        drop(read_txn);

        if !ascending {
            rows.reverse();
        }

        let page: Vec<Vec<u8>> = rows.into_iter().skip(offset).take(limit).collect();
        page.into_iter()
            .map(|bytes| {
                let mut message: Message = serde_json::from_slice(&bytes)?;
                self.decrypt_in_place(&mut message, encryptor)?;
                Ok(message)
            })
            .collect()
    }

    /// Fallback bounded scan for a store that lacks the indexed prefix
    /// query: full scan capped at
    /// [`MAX_BOUNDED_SCAN`] rows followed by in-memory filtering.
    pub fn list_via_bounded_scan(
        &self,
        session_id: &str,
        encryptor: Option<&SecretEncryptor>,
    ) -> Result<Vec<Message>> {
        let rows = self.scan_bounded(MAX_BOUNDED_SCAN)?;
        let mut messages: Vec<Message> = rows
            .into_iter()
            .filter(|(key, _)| key.starts_with(&format!("{session_id}:")))
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .collect::<Result<Vec<_>>>()?;
        for message in &mut messages {
            self.decrypt_in_place(message, encryptor)?;
        }
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    fn decrypt_in_place(
        &self,
        message: &mut Message,
        encryptor: Option<&SecretEncryptor>,
    ) -> Result<()> {
        let Some(encryptor) = encryptor else {
            return Ok(());
        };
        let Some(encoded) = message.metadata.get("encrypted").and_then(|v| v.as_str()) else {
            return Ok(());
        };
        let ciphertext = BASE64_STANDARD.decode(encoded)
            .map_err(|err| StoreError::Encryption(err.to_string()))?;
        let plaintext = encryptor.decrypt(&ciphertext)?;
        message.text = String::from_utf8_lossy(&plaintext).into_owned();

        if let Some(encoded_meta) = message
            .metadata
            .get("encryptedMetadata")
            .and_then(|v| v.as_str())
            .map(str::to_string)
        {
            let meta_ciphertext = BASE64_STANDARD.decode(&encoded_meta)
                .map_err(|err| StoreError::Encryption(err.to_string()))?;
            let meta_plaintext = encryptor.decrypt(&meta_ciphertext)?;
            message.metadata = serde_json::from_slice(&meta_plaintext)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn storage() -> (TempDir, MessageStorage) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(redb::Database::create(dir.path().join("t.db")).unwrap());
        let storage = MessageStorage::new(db).unwrap();
        (dir, storage)
    }

    #[test]
    fn list_returns_causal_order_ascending() {
        let (_dir, storage) = storage();
        storage
            .append("m-1", "s-1", Sender::User, "hi", serde_json::json!({}), 10, None, None, false)
            .unwrap();
        storage
            .append("m-2", "s-1", Sender::Bot, "hello", serde_json::json!({}), 20, Some(0.9), None, false)
            .unwrap();

        let page = storage.list("s-1", true, 10, 0, None).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].text, "hi");
        assert_eq!(page[1].text, "hello");
    }

    #[test]
    fn list_descending_reverses_order() {
        let (_dir, storage) = storage();
        storage
            .append("m-1", "s-1", Sender::User, "first", serde_json::json!({}), 1, None, None, false)
            .unwrap();
        storage
            .append("m-2", "s-1", Sender::User, "second", serde_json::json!({}), 2, None, None, false)
            .unwrap();

        let page = storage.list("s-1", false, 10, 0, None).unwrap();
        assert_eq!(page[0].text, "second");
    }

    #[test]
    fn different_sessions_do_not_leak_into_each_others_range() {
        let (_dir, storage) = storage();
        storage
            .append("m-1", "s-1", Sender::User, "a", serde_json::json!({}), 1, None, None, false)
            .unwrap();
        storage
            .append("m-2", "s-10", Sender::User, "b", serde_json::json!({}), 1, None, None, false)
            .unwrap();

        let page = storage.list("s-1", true, 10, 0, None).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].text, "a");
    }

    #[test]
    fn encrypted_roundtrip() {
        let (_dir, storage) = storage();
        let encryptor = SecretEncryptor::new(&[7u8; 32]).unwrap();
        storage
            .append(
                "m-1",
                "s-1",
                Sender::User,
                "secret text",
                serde_json::json!({}),
                1,
                None,
                Some(&encryptor),
                false,
            )
                .unwrap();

        let page = storage.list("s-1", true, 10, 0, Some(&encryptor)).unwrap();
        assert_eq!(page[0].text, "secret text");
    }

    #[test]
    fn redact_pii_clears_plaintext_columns() {
        let (_dir, storage) = storage();
        let encryptor = SecretEncryptor::new(&[7u8; 32]).unwrap();
        let stored = storage
            .append(
                "m-1",
                "s-1",
                Sender::User,
                "secret text",
                serde_json::json!({}),
                1,
                None,
                Some(&encryptor),
                true,
            )
                .unwrap();
        assert_eq!(stored.text, "");

        let page = storage.list("s-1", true, 10, 0, Some(&encryptor)).unwrap();
        assert_eq!(page[0].text, "secret text", "decrypt must restore plaintext");
    }
}
