//! Error types for agentry-state

use thiserror::Error;

/// Errors that can occur in the recruitment persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database backend failure: {0}")]
    Backend(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Candidate not found
    #[error("Candidate not found: {id}")]
    CandidateNotFound { id: String },

    /// No attempt ledger row for the (target, channel) pair
    #[error("Attempt not found for target {target_url} via {channel}")]
    AttemptNotFound { target_url: String, channel: String },

    /// Invite token unknown
    #[error("Invite token not found: {token}")]
    InviteNotFound { token: String },

    /// Invite token expired or fully used
    #[error("Invite token is no longer redeemable: {token}")]
    InviteExhausted { token: String },

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
