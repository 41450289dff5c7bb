//! Routing engine and its in-process collaborators: the session state
//! machine, the per-message routing decision, the agent presence registry,
//! the assignment cache, and the socket hub that drives them all from a
//! single `axum` WebSocket route.

pub mod accuracy_recorder;
pub mod agent_registry;
pub mod app;
pub mod assignment_cache;
pub mod auth;
pub mod config;
pub mod error;
pub mod llm_factory;
pub mod protocol;
pub mod response_matcher;
pub mod rooms;
pub mod routing;
pub mod session_lock;
pub mod socket_hub;

pub use accuracy_recorder::AccuracyRecorder;
pub use agent_registry::{AgentHandle, AgentRegistry};
pub use app::AppCore;
pub use assignment_cache::{AssignmentCache, AssignmentEntry};
pub use config::Config;
pub use error::{Result, RoutingError};
pub use protocol::{ClientEvent, ServerEvent};
pub use response_matcher::ResponseMatcher;
pub use rooms::{EventSink, SessionRooms};
pub use routing::RoutingEngine;
pub use session_lock::SessionLocks;
pub use socket_hub::ws_handler;
