use thiserror::Error;

/// Store Gateway error kinds.
///
/// `SchemaShape` is the subclass that triggers the documented single retry
/// with unknown fields stripped; all other variants degrade the current
/// turn to best-effort persistence instead of aborting it.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown attribute rejected by store: {0}")]
    SchemaShape(String),

    #[error("not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("database error: {0}")]
    Db(#[from] redb::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<redb::DatabaseError> for StoreError {
    fn from(err: redb::DatabaseError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}
