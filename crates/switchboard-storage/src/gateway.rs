use std::sync::Arc;
use std::time::Duration;

use redb::Database;
use serde_json::Value;
use switchboard_models::{
    AccuracyRecord, HumanMark, Message, MessageMetadata, Notification, PreloadedResponse, Sender,
    Session, SessionStatus, User,
};

use crate::accuracy::AccuracyStorage;
use crate::canned_responses::CannedResponseStorage;
use crate::encryption::SecretEncryptor;
use crate::error::{Result, StoreError};
use crate::llm_settings::LlmSettingsStorage;
use crate::messages::MessageStorage;
use crate::notifications::NotificationStorage;
use crate::sessions::SessionStorage;
use crate::simple_storage::SimpleStorage;
use crate::user_cache::UserCache;
use crate::users::UserStorage;

const USER_CACHE_CAPACITY: usize = 1_024;
const USER_CACHE_TTL: Duration = Duration::from_secs(60);

/// Metadata keys the wire format is allowed to carry on a visitor/agent
/// message. Anything outside this set is stripped on the
/// schema-shape retry below.
const KNOWN_MESSAGE_METADATA_KEYS: &[&str] = &[
    "encrypted",
    "encryptedMetadata",
    "agentId",
    "preloadedPattern",
    "channel",
];

/// Unifies every typed collection behind a single interface
/// (`ensureSession`, `getSession`, `appendMessage`,...). This is the
/// only persistence surface the Routing Engine talks to; individual
/// `*Storage` wrappers stay crate-internal implementation detail.
pub struct StoreGateway {
    pub sessions: SessionStorage,
    pub messages: MessageStorage,
    pub accuracy: AccuracyStorage,
    pub notifications: NotificationStorage,
    pub canned_responses: CannedResponseStorage,
    pub users: UserStorage,
    pub llm_settings: LlmSettingsStorage,
    user_cache: UserCache,
    encryptor: Option<SecretEncryptor>,
    redact_pii: bool,
}

impl StoreGateway {
    pub fn open(db: Arc<Database>, encryptor: Option<SecretEncryptor>, redact_pii: bool) -> Result<Self> {
        Ok(Self {
            sessions: SessionStorage::new(db.clone())?,
            messages: MessageStorage::new(db.clone())?,
            accuracy: AccuracyStorage::new(db.clone())?,
            notifications: NotificationStorage::new(db.clone())?,
            canned_responses: CannedResponseStorage::new(db.clone())?,
            users: UserStorage::new(db.clone())?,
            llm_settings: LlmSettingsStorage::new(db)?,
            user_cache: UserCache::new(USER_CACHE_CAPACITY, USER_CACHE_TTL),
            encryptor,
            redact_pii,
        })
    }

    /// `getUser(userId)`, served from the TTL+LRU cache on a hit.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        if let Some(cached) = self.user_cache.get(user_id) {
            return Ok(Some(cached));
        }
        let found = self.users.get(user_id)?;
        if let Some(user) = &found {
            self.user_cache.put(user.clone());
        }
        Ok(found)
    }

    /// `getUserByEmail(email)`, served from the same cache.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        if let Some(cached) = self.user_cache.get_by_email(email) {
            return Ok(Some(cached));
        }
        let found = self.users.get_by_email(email)?;
        if let Some(user) = &found {
            self.user_cache.put(user.clone());
        }
        Ok(found)
    }

    /// `upsertUser`; invalidates the cached entry so a stale copy can't
    /// outlive the write it was just overwritten by.
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.users.upsert(user)?;
        self.user_cache.invalidate(&user.user_id);
        Ok(())
    }

    /// `ensureSession`.
    pub fn ensure_session(&self, id: &str, user_meta: Value, now: i64) -> Result<Session> {
        tracing::debug!(session_id = id, "ensureSession");
        self.sessions.ensure(id, user_meta, now)
    }

    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        self.sessions.get(id)
    }

    pub fn update_session_status(
        &self,
        id: &str,
        status: SessionStatus,
        assigned_agent: Option<Option<String>>,
        ai_paused: Option<bool>,
        now: i64,
    ) -> Result<Session> {
        self.sessions.update_status(id, status, assigned_agent, ai_paused, now)
    }

    pub fn assign_agent(&self, id: &str, agent_id: &str, now: i64) -> Result<Session> {
        tracing::debug!(session_id = id, agent_id, "assignAgent");
        self.sessions.assign_agent(id, agent_id, now)
    }

    /// `appendMessage`, with the documented single retry:
    /// if the first attempt fails with [`StoreError::SchemaShape`], unknown
    /// metadata keys are stripped and the append retried exactly once.
    #[allow(clippy::too_many_arguments)]
    pub fn append_message(
        &self,
        id: &str,
        session_id: &str,
        sender: Sender,
        text: &str,
        metadata: MessageMetadata,
        created_at: i64,
        confidence: Option<f32>,
    ) -> Result<Message> {
        match self.messages.append(
            id,
            session_id,
            sender,
            text,
            metadata.clone(),
            created_at,
            confidence,
            self.encryptor.as_ref(),
            self.redact_pii,
        ) {
            Ok(message) => Ok(message),
            Err(StoreError::SchemaShape(reason)) => {
                tracing::warn!(session_id, reason, "appendMessage schema-shape rejection, retrying once with stripped metadata");
                let stripped = strip_unknown_metadata(metadata);
                self.messages.append(
                    id,
                    session_id,
                    sender,
                    text,
                    stripped,
                    created_at,
                    confidence,
                    self.encryptor.as_ref(),
                    self.redact_pii,
                )
            }
            Err(err) => Err(err),
        }
    }

    /// Best-effort variant used on the routing hot path: never propagates a
    /// store failure, logs and returns `None` instead so the in-memory
    /// fan-out still proceeds.
    #[allow(clippy::too_many_arguments)]
    pub fn append_message_best_effort(
        &self,
        id: &str,
        session_id: &str,
        sender: Sender,
        text: &str,
        metadata: MessageMetadata,
        created_at: i64,
        confidence: Option<f32>,
    ) -> Option<Message> {
        match self.append_message(id, session_id, sender, text, metadata, created_at, confidence) {
            Ok(message) => Some(message),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "appendMessage failed; continuing best-effort");
                None
            }
        }
    }

    /// `listMessages(sessionId, {order, limit, offset})`.
    /// Falls back to a bounded scan when the indexed range query itself
    /// errors, since the underlying store lacks rich query support.
    pub fn list_messages(
        &self,
        session_id: &str,
        ascending: bool,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>> {
        match self
            .messages
            .list(session_id, ascending, limit, offset, self.encryptor.as_ref())
        {
            Ok(messages) => Ok(messages),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "indexed listMessages failed, falling back to bounded scan");
                let mut messages = self
                    .messages
                    .list_via_bounded_scan(session_id, self.encryptor.as_ref())?;
                if !ascending {
                    messages.reverse();
                }
                Ok(messages.into_iter().skip(offset).take(limit).collect())
            }
        }
    }

    /// `saveAccuracyRecord`.
    pub fn save_accuracy_record(&self, record: &AccuracyRecord) -> Result<()> {
        self.accuracy.save(record)
    }

    pub fn apply_accuracy_feedback(
        &self,
        id: &str,
        admin_id: &str,
        human_mark: Option<HumanMark>,
        evaluation: Option<String>,
        note: Option<String>,
        now: i64,
    ) -> Result<AccuracyRecord> {
        let (record, audit) = self
            .accuracy
            .apply_feedback(id, admin_id, human_mark, evaluation, note, now)?;
        tracing::debug!(accuracy_id = %audit.accuracy_id, admin_id = %audit.admin_id, "accuracy feedback recorded");
        Ok(record)
    }

    /// `appendNotification`, best-effort per the same
    /// failure model as message appends.
    pub fn append_notification(&self, notification: &Notification) {
        self.notifications.append_best_effort(notification);
    }

    /// `listCannedResponses`: all active, visitor-facing
    /// entries in store order, ready for the Response Matcher to scan.
    pub fn list_canned_responses(&self) -> Result<Vec<PreloadedResponse>> {
        Ok(self
            .canned_responses
            .list()?
            .into_iter()
            .filter(PreloadedResponse::participates_in_visitor_matching)
            .collect())
    }
}

fn strip_unknown_metadata(metadata: MessageMetadata) -> MessageMetadata {
    match metadata {
        Value::Object(mut map) => {
            map.retain(|key, _| KNOWN_MESSAGE_METADATA_KEYS.contains(&key.as_str()));
            Value::Object(map)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gateway() -> (TempDir, StoreGateway) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::create(dir.path().join("t.db")).unwrap());
        let gateway = StoreGateway::open(db, None, false).unwrap();
        (dir, gateway)
    }

    #[test]
    fn ensure_session_then_append_and_list_messages() {
        let (_dir, gateway) = gateway();
        gateway.ensure_session("s-1", serde_json::json!({}), 1).unwrap();
        gateway
            .append_message("m-1", "s-1", Sender::User, "hi", serde_json::json!({}), 1, None)
            .unwrap();
        gateway
            .append_message("m-2", "s-1", Sender::Bot, "hello", serde_json::json!({}), 2, Some(0.9))
            .unwrap();

        let messages = gateway.list_messages("s-1", true, 10, 0).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn strip_unknown_metadata_keeps_allowlisted_keys() {
        let metadata = serde_json::json!({"agentId": "a-1", "junk": "drop me"});
        let stripped = strip_unknown_metadata(metadata);
        assert_eq!(stripped, serde_json::json!({"agentId": "a-1"}));
    }

    #[test]
    fn list_canned_responses_excludes_shortcuts_and_inactive() {
        let (_dir, gateway) = gateway();
        gateway
            .canned_responses
            .upsert(&PreloadedResponse::new(
                "hours",
                switchboard_models::MatchType::Exact,
                "9-5",
            ))
                .unwrap();
        let mut inactive = PreloadedResponse::new(
            "closed",
            switchboard_models::MatchType::Keyword,
            "we are closed",
        );
        inactive.active = false;
        gateway.canned_responses.upsert(&inactive).unwrap();
        gateway
            .canned_responses
            .upsert(&PreloadedResponse::new(
                "/ban",
                switchboard_models::MatchType::Shortcut,
                "banned",
            ))
                .unwrap();

        let matching = gateway.list_canned_responses().unwrap();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].pattern, "hours");
    }

    #[test]
    fn get_user_is_served_from_cache_after_first_lookup() {
        use switchboard_models::AccountStatus;

        let (_dir, gateway) = gateway();
        let user = switchboard_models::User {
            user_id: "u-1".to_string(),
            email: "a@example.com".to_string(),
            name: "Agent Smith".to_string(),
            roles: vec!["agent".to_string()],
            account_status: AccountStatus::Active,
            permissions: vec![],
            created_at: 1,
            updated_at: 1,
        };
        gateway.upsert_user(&user).unwrap();

        let first = gateway.get_user("u-1").unwrap().unwrap();
        let by_email = gateway.get_user_by_email("a@example.com").unwrap().unwrap();
        assert_eq!(first.user_id, by_email.user_id);

        let reupserted = switchboard_models::User { name: "Renamed".to_string(), ..user };
        gateway.upsert_user(&reupserted).unwrap();
        assert_eq!(gateway.get_user("u-1").unwrap().unwrap().name, "Renamed");
    }
}
