//! Persisted and wire data types shared across the routing engine.
//!
//! These mirror the collections in the document-store persistence contract:
//! one module per collection, plus the in-memory event payloads that ride
//! over the visitor/agent socket.

mod accuracy;
mod llm_settings;
mod message;
mod notification;
mod preloaded;
mod session;
mod user;

pub use accuracy::{AccuracyAudit, AccuracyRecord, HumanMark, ResponseType};
pub use llm_settings::{HealthStatus, LlmSettings};
pub use message::{Message, MessageMetadata, Sender};
pub use notification::{Notification, NotificationType};
pub use preloaded::{MatchType, PreloadedResponse};
pub use session::{Session, SessionStatus};
pub use user::{AccountStatus, User};

/// Current UTC time as milliseconds since epoch, the timestamp shape used
/// throughout the persisted records (ISO-8601 strings are produced at the
/// storage boundary, not carried in-memory).
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
