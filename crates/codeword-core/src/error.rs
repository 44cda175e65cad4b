//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// A command whose preconditions do not hold is not an error; handlers
/// report that as an ignored outcome instead.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No session exists for the join code.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The session has left the lobby and the caller is not a member.
    #[error("game in progress: {0}")]
    GameInProgress(String),

    /// A transaction kept losing to concurrent writers.
    #[error("concurrency conflict on {path}: gave up after {attempts} attempts")]
    ConcurrencyConflict {
        /// The document path the transaction targeted.
        path: String,
        /// How many times the transaction function ran.
        attempts: u32,
    },

    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A store or serialization failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Infrastructure(format!("document (de)serialization failed: {err}"))
    }
}
