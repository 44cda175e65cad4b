//! Codeword simulation — error types.

use std::time::Duration;

use codeword_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// A configuration variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A handler or the document store failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The session document disappeared mid-game.
    #[error("session {0} vanished")]
    SessionVanished(String),

    /// Every bot stopped but the session has no winner.
    #[error("session {0} ended without a winner")]
    NoWinner(String),

    /// A bot was removed from the session it was playing in.
    #[error("player {player_id} is no longer in session {code}")]
    Evicted {
        /// The session code.
        code: String,
        /// The bot's identity.
        player_id: String,
    },

    /// The game did not finish in time.
    #[error("game did not finish within {0:?}")]
    Timeout(Duration),

    /// A bot task panicked or was cancelled.
    #[error("bot task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_display_transparently() {
        let err = SimError::from(DomainError::SessionNotFound("ABCD".into()));

        assert_eq!(err.to_string(), "session not found: ABCD");
    }

    #[test]
    fn test_timeout_mentions_duration() {
        let err = SimError::Timeout(Duration::from_secs(3));

        assert!(err.to_string().contains("3s"));
    }
}
