//! Store Gateway: typed, redb-backed persistence for the routing server.
//! One module per document-store collection, plus
//! [`gateway::StoreGateway`], the single interface the routing engine talks
//! to.

pub mod accuracy;
pub mod canned_responses;
pub mod encryption;
pub mod error;
pub mod gateway;
pub mod llm_settings;
pub mod messages;
pub mod notifications;
pub mod sessions;
pub mod simple_storage;
pub mod user_cache;
pub mod users;

pub use encryption::SecretEncryptor;
pub use error::{Result, StoreError};
pub use gateway::StoreGateway;
