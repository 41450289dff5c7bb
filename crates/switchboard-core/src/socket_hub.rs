//! Accepts visitor and agent connections over a single `axum` WebSocket
//! route, maintains session rooms, enforces authentication for agent
//! events, dispatches to the Routing Engine, and emits admin feed events.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::task::JoinHandle;

use switchboard_models::{now_ms, NotificationType, ResponseType, Sender};

use crate::accuracy_recorder::AccuracyRecorder;
use crate::app::AppCore;
use crate::auth::resolve_principal;
use crate::protocol::{AuthenticatedUser, ClientEvent, ServerEvent};
use crate::rooms::EventSink;
use crate::routing::RoutingEngine;

const REQUEST_AGENT_ACK: &str = "A team member has been notified and will join shortly.";

#[derive(Default)]
struct ConnectionState {
    agent_id: Option<String>,
    forwarders: Vec<JoinHandle<()>>,
}

impl Drop for ConnectionState {
    fn drop(&mut self) {
        for handle in self.forwarders.drain(..) {
            handle.abort();
        }
    }
}

pub async fn ws_handler(State(core): State<Arc<AppCore>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, core))
}

async fn handle_socket(socket: WebSocket, core: Arc<AppCore>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = unbounded_channel::<ServerEvent>();

    let forward_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else { continue };
            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut conn = ConnectionState::default();

    while let Some(Ok(msg)) = ws_rx.next().await {
        let WsMessage::Text(text) = msg else { continue };
        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(err) => {
                let _ = out_tx.send(ServerEvent::SessionError { error: format!("malformed frame: {err}") });
                continue;
            }
        };

        if !dispatch(&core, &out_tx, &mut conn, event).await {
            break;
        }
    }

    if let Some(agent_id) = conn.agent_id.clone() {
        core.agents.unbind(&agent_id, &out_tx);
    }
    forward_task.abort();
}

/// Handles one parsed frame. Returns `false` when the connection should be
/// closed (an `agent_auth` failure).
async fn dispatch(core: &Arc<AppCore>, out_tx: &UnboundedSender<ServerEvent>, conn: &mut ConnectionState, event: ClientEvent) -> bool {
    match event {
        ClientEvent::StartSession { session_id, user_meta } => {
            let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let now = now_ms();
            if let Err(err) = core.store.ensure_session(&session_id, user_meta.unwrap_or(json!({})), now) {
                tracing::warn!(session_id, error = %err, "ensureSession failed on start_session");
            }
            join_room(core, out_tx, conn, &session_id);
            let _ = out_tx.send(ServerEvent::SessionStarted { session_id: session_id.clone() });

            let welcome = core.config.welcome_message.clone();
            let message_id = uuid::Uuid::new_v4().to_string();
            core.store.append_message_best_effort(&message_id, &session_id, Sender::Bot, &welcome, json!({"responseType": "stub"}), now, None);
            core.rooms.emit_session(&session_id, ServerEvent::BotMessage { text: welcome.clone(), confidence: None });
            AccuracyRecorder::new(&core.store).record(&uuid::Uuid::new_v4().to_string(), &session_id, Some(&message_id), &welcome, None, 0, 0, ResponseType::Stub, now);
        }

        ClientEvent::UserMessage { session_id, text } => {
            let engine = RoutingEngine::new(
                &core.store,
                &core.agents,
                &core.assignments,
                &core.matcher,
                &core.locks,
                core.llm.as_ref(),
                core.config.llm_history_limit,
                core.config.system_prompt.clone(),
            );
            engine.handle_user_message(&core.rooms, &session_id, &text).await;
        }

        ClientEvent::TypingStart { session_id } => {
            core.rooms.emit_session(&session_id, ServerEvent::DisplayTyping { user: "visitor".to_string(), is_typing: true });
        }
        ClientEvent::TypingStop { session_id } => {
            core.rooms.emit_session(&session_id, ServerEvent::DisplayTyping { user: "visitor".to_string(), is_typing: false });
        }

        ClientEvent::RequestAgent { session_id } => {
            let now = now_ms();
            if let Err(err) = core.store.update_session_status(&session_id, switchboard_models::SessionStatus::NeedsHuman, None, None, now) {
                tracing::warn!(session_id, error = %err, "failed to mark session needs_human on request_agent");
            }
            core.assignments.clear(&session_id);
            core.rooms.emit_session(&session_id, ServerEvent::BotMessage { text: REQUEST_AGENT_ACK.to_string(), confidence: None });
            core.store.append_notification(&switchboard_models::Notification::new(
                uuid::Uuid::new_v4().to_string(),
                NotificationType::NeedsHelp,
                format!("Session {session_id} requested a human agent"),
                &session_id,
                now,
            ));
            core.rooms.emit_admin(ServerEvent::NewNotification { notification: json!({"type": "needs_help", "sessionId": session_id}) });
        }

        ClientEvent::VisitorJoin { session_id } => {
            core.live_visitors.insert(session_id);
            let visitors: Vec<String> = core.live_visitors.iter().map(|v| v.clone()).collect();
            core.rooms.emit_admin(ServerEvent::LiveVisitorsUpdate { visitors });
        }

        ClientEvent::JoinSession { session_id } => {
            join_room(core, out_tx, conn, &session_id);
        }

        ClientEvent::JoinAdminFeed => {
            join_admin_feed(core, out_tx, conn);
        }

        ClientEvent::AgentAuth { token, agent_id } => {
            let Some(user) = resolve_principal(&core.config, &token) else {
                let _ = out_tx.send(ServerEvent::AuthError { message: "invalid token".to_string() });
                return false;
            };
            if !user.can_authenticate_as_agent() {
                let _ = out_tx.send(ServerEvent::AuthError { message: "insufficient role".to_string() });
                return false;
            }
            let resolved_agent_id = agent_id.unwrap_or_else(|| user.user_id.clone());
            core.agents.bind(&resolved_agent_id, out_tx.clone());
            conn.agent_id = Some(resolved_agent_id);
            let _ = out_tx.send(ServerEvent::AuthSuccess {
                user: AuthenticatedUser { user_id: user.user_id, email: user.email, roles: user.roles, permissions: user.permissions },
            });
        }

        ClientEvent::AgentTakeover { session_id, agent_id } => {
            if conn.agent_id.as_deref() != Some(agent_id.as_str()) {
                let _ = out_tx.send(ServerEvent::SessionError { error: "agentId does not match authenticated connection".to_string() });
                return true;
            }
            let now = now_ms();
            match core.store.assign_agent(&session_id, &agent_id, now) {
                Ok(_) => {
                    core.assignments.set(&session_id, crate::assignment_cache::AssignmentEntry { agent_id: Some(agent_id.clone()), ai_paused: true });
                    join_room(core, out_tx, conn, &session_id);
                    let system_message_id = uuid::Uuid::new_v4().to_string();
                    core.store.append_message_best_effort(&system_message_id, &session_id, Sender::System, &format!("Agent {agent_id} joined"), json!({"agentId": agent_id}), now, None);
                    core.rooms.emit_session(&session_id, ServerEvent::AgentJoined { agent_id: agent_id.clone(), agent_name: None });
                    core.rooms.emit_admin(ServerEvent::NewNotification { notification: json!({"type": "agent_joined", "sessionId": session_id, "agentId": agent_id}) });
                }
                Err(err) => {
                    let _ = out_tx.send(ServerEvent::SessionError { error: format!("assignment rejected: {err}") });
                }
            }
        }

        ClientEvent::AgentMessage { session_id, text, agent_id } => {
            if conn.agent_id.as_deref() != Some(agent_id.as_str()) {
                let _ = out_tx.send(ServerEvent::SessionError { error: "agentId does not match authenticated connection".to_string() });
                return true;
            }
            let now = now_ms();
            core.store.append_message_best_effort(&uuid::Uuid::new_v4().to_string(), &session_id, Sender::Agent, &text, json!({"agentId": agent_id}), now, None);
            core.rooms.emit_session(&session_id, ServerEvent::AgentMessage { text, agent_id, sender: "agent", ts: now });
        }
    }

    true
}

fn join_room(core: &Arc<AppCore>, out_tx: &UnboundedSender<ServerEvent>, conn: &mut ConnectionState, session_id: &str) {
    let mut receiver = core.rooms.join(session_id);
    let out_tx = out_tx.clone();
    conn.forwarders.push(tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            if out_tx.send(event).is_err() {
                break;
            }
        }
    }));
}

fn join_admin_feed(core: &Arc<AppCore>, out_tx: &UnboundedSender<ServerEvent>, conn: &mut ConnectionState) {
    let mut receiver = core.rooms.join_admin_feed();
    let out_tx = out_tx.clone();
    conn.forwarders.push(tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            if out_tx.send(event).is_err() {
                break;
            }
        }
    }));
}
