//! Top-level routing error, converted by the Socket Hub into `session_error`
//! / `auth_error` wire events, one level up from the crate-local
//! `StoreError`/`LlmError`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("assistant unavailable: {0}")]
    LlmUnavailable(String),

    #[error("assignment conflict: {0}")]
    AssignmentConflict(String),
}

impl From<switchboard_storage::StoreError> for RoutingError {
    fn from(err: switchboard_storage::StoreError) -> Self {
        RoutingError::StoreUnavailable(err.to_string())
    }
}

impl From<switchboard_llm::LlmError> for RoutingError {
    fn from(err: switchboard_llm::LlmError) -> Self {
        RoutingError::LlmUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RoutingError>;
