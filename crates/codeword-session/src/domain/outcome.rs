//! Command outcomes.
//!
//! A command whose preconditions do not hold against the freshest snapshot
//! is dropped, not failed: clients race each other constantly and a stale
//! button press is normal.

use std::fmt;

use codeword_rules::domain::abilities::AbilityRejection;
use codeword_rules::domain::model::Phase;

/// What a handler did with a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The write or transaction was committed.
    Applied,
    /// Nothing was written.
    Ignored(IgnoredReason),
}

impl CommandOutcome {
    /// Whether the command changed the document.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Why a command was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoredReason {
    /// The session document is gone.
    SessionMissing,
    /// The actor is not in the session.
    NotAMember,
    /// The actor joined earlier; their record is kept as it is.
    AlreadyJoined,
    /// The actor was ejected in round 1.
    Eliminated,
    /// The session is in another phase.
    WrongPhase {
        /// Phase the command needs.
        expected: Phase,
        /// Phase the session is in.
        actual: Phase,
    },
    /// Only the effective host may do this, or the grace period has not
    /// run out for anyone else.
    NotHost,
    /// Too few players to start.
    NotEnoughPlayers {
        /// Players required.
        required: usize,
        /// Players present.
        present: usize,
    },
    /// Someone in the lobby is not ready.
    PlayersNotReady,
    /// A deadline has not passed yet.
    DeadlineNotReached,
    /// Some active player has not locked a vote.
    VotesOutstanding,
    /// The actor already locked a vote this round.
    VoteAlreadyLocked,
    /// The vote target is missing or eliminated.
    InvalidTarget,
    /// The game already has a winner or round 2 was played.
    NoFurtherRound,
    /// The session is already a fresh lobby.
    AlreadyInLobby,
    /// The card could not be played.
    Ability(AbilityRejection),
}

impl fmt::Display for IgnoredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionMissing => f.write_str("session no longer exists"),
            Self::NotAMember => f.write_str("actor is not in the session"),
            Self::AlreadyJoined => f.write_str("actor is already in the session"),
            Self::Eliminated => f.write_str("actor is eliminated"),
            Self::WrongPhase { expected, actual } => {
                write!(f, "expected phase {expected}, session is in {actual}")
            }
            Self::NotHost => f.write_str("not the effective host"),
            Self::NotEnoughPlayers { required, present } => {
                write!(f, "need {required} players, have {present}")
            }
            Self::PlayersNotReady => f.write_str("not every player is ready"),
            Self::DeadlineNotReached => f.write_str("deadline has not passed"),
            Self::VotesOutstanding => f.write_str("votes are still outstanding"),
            Self::VoteAlreadyLocked => f.write_str("vote already locked"),
            Self::InvalidTarget => f.write_str("target is not an active player"),
            Self::NoFurtherRound => f.write_str("no further round to play"),
            Self::AlreadyInLobby => f.write_str("session is already in the lobby"),
            Self::Ability(rejection) => write!(f, "ability rejected: {rejection}"),
        }
    }
}

impl From<AbilityRejection> for IgnoredReason {
    fn from(rejection: AbilityRejection) -> Self {
        Self::Ability(rejection)
    }
}
