//! Per-message routing decision: close phrase -> farewell;
//! human-request intent -> needs-help flag; assignment present -> forward
//! to agent; otherwise -> Matcher -> LLM Gateway. Persists every turn
//! before fanning it out to subscribers.

use std::time::Instant;

use serde_json::json;
use switchboard_llm::{ChatMessage, CompletionRequest, LlmError, LlmGateway};
use switchboard_models::{now_ms, Message, NotificationType, ResponseType, Sender, SessionStatus};
use switchboard_storage::StoreGateway;

use crate::accuracy_recorder::AccuracyRecorder;
use crate::agent_registry::AgentRegistry;
use crate::assignment_cache::AssignmentCache;
use crate::response_matcher::ResponseMatcher;
use crate::rooms::EventSink;
use crate::session_lock::SessionLocks;
use crate::protocol::ServerEvent;

/// Key an operator configures an `exact` preloaded response under to supply
/// the farewell text sent when a session closes: a farewell from the
/// Matcher's `system-closing` entry, if configured.
pub const SYSTEM_CLOSING_KEY: &str = "system-closing";

const CLOSING_PHRASES: &[&str] = &["bye", "goodbye", "thanks", "thank you", "see you", "cya"];
const AGENT_INTENT_NOUNS: &[&str] = &["agent", "human", "support", "representative"];
const AGENT_INTENT_VERBS: &[&str] = &["talk", "speak", "connect", "want", "need"];

fn is_closing_phrase(normalized: &str) -> bool {
    CLOSING_PHRASES.iter().any(|phrase| normalized == *phrase || normalized.ends_with(&format!(" {phrase}")))
}

fn is_human_agent_intent(normalized: &str) -> bool {
    let has_noun = AGENT_INTENT_NOUNS.iter().any(|noun| normalized.contains(noun));
    let has_verb = AGENT_INTENT_VERBS.iter().any(|verb| normalized.contains(verb));
    has_noun && has_verb
}

fn normalize_loose(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Deterministic reply for step 6's acknowledgement.
const HUMAN_ESCALATION_ACK: &str = "I've flagged this for a team member — they'll join shortly.";

pub struct RoutingEngine<'a> {
    store: &'a StoreGateway,
    agents: &'a AgentRegistry,
    assignments: &'a AssignmentCache,
    matcher: &'a ResponseMatcher,
    locks: &'a SessionLocks,
    llm: Option<&'a LlmGateway>,
    history_limit: usize,
    system_prompt: String,
}

impl<'a> RoutingEngine<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a StoreGateway,
        agents: &'a AgentRegistry,
        assignments: &'a AssignmentCache,
        matcher: &'a ResponseMatcher,
        locks: &'a SessionLocks,
        llm: Option<&'a LlmGateway>,
        history_limit: usize,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self { store, agents, assignments, matcher, locks, llm, history_limit, system_prompt: system_prompt.into() }
    }

    /// `handleUserMessage(sessionId, text)`. Serializes on
    /// `sessionId` via [`SessionLocks`] so two user messages on the same
    /// session never interleave their persistence or emission.
    pub async fn handle_user_message(&self, sink: &dyn EventSink, session_id: &str, text: &str) {
        let _guard = self.locks.lock(session_id).await;
        self.handle_user_message_locked(sink, session_id, text).await;
    }

    async fn handle_user_message_locked(&self, sink: &dyn EventSink, session_id: &str, text: &str) {
        let started = Instant::now();

        // Step 1: validate.
        let trimmed = text.trim();
        if session_id.is_empty() || trimmed.is_empty() {
            sink.emit_session(session_id, ServerEvent::SessionError { error: "sessionId and text are required".to_string() });
            return;
        }

        // Step 2: persist the user turn, then fan out so admins observing
        // the session see it before any bot/agent reply.
        let now = now_ms();
        let user_message_id = uuid::Uuid::new_v4().to_string();
        self.store.append_message_best_effort(&user_message_id, session_id, Sender::User, trimmed, json!({}), now, None);
        sink.emit_session(session_id, ServerEvent::UserMessage { text: trimmed.to_string(), sender: "user", ts: now });

        // Step 3: resolve assignment.
        let assignment = match self.assignments.resolve(self.store, session_id) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(session_id, error = %err, "assignment resolve failed, treating as unassigned");
                None
            }
        };

        // Step 4: forward to agent under pause/assignment.
        if let Some(entry) = &assignment {
            let status = self.store.get_session(session_id).ok().flatten().map(|s| s.status);
            let paused_or_assigned =
                entry.ai_paused || entry.agent_id.is_some() || status == Some(SessionStatus::AgentAssigned);
            if paused_or_assigned {
                if let Some(agent_id) = &entry.agent_id {
                    let delivered = self.agents.send(
                        agent_id,
                        ServerEvent::UserMessageForAgent { session_id: session_id.to_string(), text: trimmed.to_string(), ts: now },
                    );
                    if !delivered {
                        tracing::info!(session_id, agent_id, "assigned agent offline, no AI fallback under pause");
                        self.store.append_notification(&switchboard_models::Notification::new(
                            uuid::Uuid::new_v4().to_string(),
                            NotificationType::AgentOffline,
                            format!("Agent {agent_id} is offline; visitor message is waiting in session {session_id}"),
                            session_id,
                            now,
                        ));
                    }
                } else {
                    tracing::info!(session_id, "AI paused with no assigned agent on file; no reply sent");
                }
                return;
            }
        }

        let normalized = normalize_loose(trimmed);

        // Step 5: ending-phrase detection.
        if is_closing_phrase(&normalized) {
            if let Some(farewell) = self.matcher.named(SYSTEM_CLOSING_KEY) {
                self.reply_preloaded(sink, session_id, &farewell, started);
                return;
            }
        }

        // Step 6: human-agent-intent detection.
        if is_human_agent_intent(&normalized) {
            let now = now_ms();
            if let Err(err) = self.store.update_session_status(session_id, SessionStatus::NeedsHuman, None, None, now) {
                tracing::warn!(session_id, error = %err, "failed to mark session needs_human");
            }
            self.assignments.clear(session_id);
            let ack_id = uuid::Uuid::new_v4().to_string();
            self.store.append_message_best_effort(&ack_id, session_id, Sender::System, HUMAN_ESCALATION_ACK, json!({}), now, None);
            sink.emit_session(session_id, ServerEvent::BotMessage { text: HUMAN_ESCALATION_ACK.to_string(), confidence: None });
            self.store.append_notification(&switchboard_models::Notification::new(
                uuid::Uuid::new_v4().to_string(),
                NotificationType::NeedsHelp,
                format!("Session {session_id} requested a human agent"),
                session_id,
                now,
            ));
            sink.emit_admin(ServerEvent::NewNotification {
                notification: json!({"type": "needs_help", "sessionId": session_id}),
            });
            return;
        }

        // Step 7: Response Matcher.
        if let Some(reply) = self.matcher.matches(trimmed) {
            self.reply_preloaded(sink, session_id, &reply, started);
            return;
        }

        // Step 8: LLM Gateway.
        self.reply_with_llm(sink, session_id, trimmed, started).await;
    }

    fn reply_preloaded(&self, sink: &dyn EventSink, session_id: &str, reply: &str, started: Instant) {
        let now = now_ms();
        let latency_ms = started.elapsed().as_millis() as u64;
        let message_id = uuid::Uuid::new_v4().to_string();
        self.store.append_message_best_effort(&message_id, session_id, Sender::Bot, reply, json!({"responseType": "preloaded"}), now, None);
        sink.emit_session(session_id, ServerEvent::BotMessage { text: reply.to_string(), confidence: None });
        AccuracyRecorder::new(self.store).record(
            &uuid::Uuid::new_v4().to_string(),
            session_id,
            Some(&message_id),
            reply,
            None,
            latency_ms,
            0,
            ResponseType::Preloaded,
            now,
        );
    }

    async fn reply_with_llm(&self, sink: &dyn EventSink, session_id: &str, text: &str, started: Instant) {
        let Some(llm) = self.llm else {
            self.reply_fallback(sink, session_id, started);
            return;
        };

        // Step 2 already persisted the current user turn, so it is the last
        // entry in this history — drop it here, it gets appended once below.
        let mut history = self.store.list_messages(session_id, true, self.history_limit, 0).unwrap_or_default();
        if matches!(history.last(), Some(last) if last.sender == Sender::User && last.text == text) {
            history.pop();
        }
        let mut messages = vec![ChatMessage::system(self.system_prompt.clone())];
        messages.extend(history.iter().filter_map(history_to_chat_message));
        messages.push(ChatMessage::user(text.to_string()));

        match llm.complete(CompletionRequest::new(messages)).await {
            Ok(reply) => {
                let now = now_ms();
                let message_id = uuid::Uuid::new_v4().to_string();
                self.store.append_message_best_effort(&message_id, session_id, Sender::Bot, &reply.text, json!({"responseType": "ai"}), now, Some(reply.confidence));
                sink.emit_session(session_id, ServerEvent::BotMessage { text: reply.text.clone(), confidence: Some(reply.confidence) });
                AccuracyRecorder::new(self.store).record(
                    &uuid::Uuid::new_v4().to_string(),
                    session_id,
                    Some(&message_id),
                    &reply.text,
                    Some(reply.confidence),
                    reply.latency_ms,
                    reply.tokens,
                    ResponseType::Ai,
                    now,
                );
            }
            Err(err) => {
                let rate_limited = matches!(err, LlmError::RateLimited { .. });
                if rate_limited {
                    let now = now_ms();
                    if let Err(store_err) = self.store.update_session_status(session_id, SessionStatus::NeedsHuman, None, None, now) {
                        tracing::warn!(session_id, error = %store_err, "failed to mark session needs_human after rate limit");
                    }
                    self.store.append_notification(&switchboard_models::Notification::new(
                        uuid::Uuid::new_v4().to_string(),
                        NotificationType::NeedsHelp,
                        format!("Session {session_id} hit an LLM rate limit"),
                        session_id,
                        now,
                    ));
                }
                tracing::warn!(session_id, error = %err, "LLM call failed, replying with fallback");
                self.reply_fallback(sink, session_id, started);
            }
        }
    }

    fn reply_fallback(&self, sink: &dyn EventSink, session_id: &str, started: Instant) {
        let now = now_ms();
        let latency_ms = started.elapsed().as_millis() as u64;
        let text = switchboard_llm::FALLBACK_TEXT;
        let message_id = uuid::Uuid::new_v4().to_string();
        self.store.append_message_best_effort(&message_id, session_id, Sender::Bot, text, json!({"responseType": "fallback"}), now, Some(0.0));
        sink.emit_session(session_id, ServerEvent::BotMessage { text: text.to_string(), confidence: Some(0.0) });
        AccuracyRecorder::new(self.store).record(
            &uuid::Uuid::new_v4().to_string(),
            session_id,
            Some(&message_id),
            text,
            Some(0.0),
            latency_ms,
            0,
            ResponseType::Fallback,
            now,
        );
    }
}

fn history_to_chat_message(message: &Message) -> Option<ChatMessage> {
    match message.sender {
        Sender::User => Some(ChatMessage::user(message.text.clone())),
        Sender::Bot | Sender::Agent => Some(ChatMessage::assistant(message.text.clone())),
        Sender::System => None,
    }
}
