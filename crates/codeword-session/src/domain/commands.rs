//! Commands for the Session & Synchronization context.

use codeword_core::command::Command;
use codeword_rules::domain::model::PlayerId;
use uuid::Uuid;

/// Command to create a new lobby with the caller as host.
#[derive(Debug, Clone)]
pub struct CreateSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The creating player.
    pub player_id: PlayerId,
    /// The creator's display name.
    pub name: String,
}

impl Command for CreateSession {
    fn command_type(&self) -> &'static str {
        "session.create_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to join an existing lobby by code.
#[derive(Debug, Clone)]
pub struct JoinSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The join code as typed; matched case-insensitively.
    pub code: String,
    /// The joining player.
    pub player_id: PlayerId,
    /// The joining player's display name.
    pub name: String,
}

impl Command for JoinSession {
    fn command_type(&self) -> &'static str {
        "session.join_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to leave a session.
#[derive(Debug, Clone)]
pub struct LeaveSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The leaving player.
    pub player_id: PlayerId,
}

impl Command for LeaveSession {
    fn command_type(&self) -> &'static str {
        "session.leave_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to flip the caller's lobby readiness.
#[derive(Debug, Clone)]
pub struct ToggleReady {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The acting player.
    pub player_id: PlayerId,
}

impl Command for ToggleReady {
    fn command_type(&self) -> &'static str {
        "session.toggle_ready"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to deal roles and open the first discussion.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The acting player; must be the host.
    pub player_id: PlayerId,
}

impl Command for StartGame {
    fn command_type(&self) -> &'static str {
        "session.start_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to play the caller's ability card.
#[derive(Debug, Clone)]
pub struct UseAbility {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The acting player.
    pub player_id: PlayerId,
    /// The card target; may be the actor.
    pub target_id: PlayerId,
}

impl Command for UseAbility {
    fn command_type(&self) -> &'static str {
        "session.use_ability"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to add or withdraw the caller's request to end discussion early.
#[derive(Debug, Clone)]
pub struct ToggleSkipDiscussion {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The acting player.
    pub player_id: PlayerId,
}

impl Command for ToggleSkipDiscussion {
    fn command_type(&self) -> &'static str {
        "session.toggle_skip_discussion"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to cast and lock the caller's vote.
#[derive(Debug, Clone)]
pub struct CastVote {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The voting player.
    pub player_id: PlayerId,
    /// The suspect.
    pub target_id: PlayerId,
}

impl Command for CastVote {
    fn command_type(&self) -> &'static str {
        "session.cast_vote"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to close a discussion whose timer has run out.
#[derive(Debug, Clone)]
pub struct ForceVoting {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The client performing the duty.
    pub player_id: PlayerId,
}

impl Command for ForceVoting {
    fn command_type(&self) -> &'static str {
        "session.force_voting"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to enter the suspense pause once every vote is locked.
#[derive(Debug, Clone)]
pub struct BeginSuspense {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The client performing the duty.
    pub player_id: PlayerId,
}

impl Command for BeginSuspense {
    fn command_type(&self) -> &'static str {
        "session.begin_suspense"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to tally the round and show the results.
#[derive(Debug, Clone)]
pub struct ResolveVotes {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The client performing the duty.
    pub player_id: PlayerId,
}

impl Command for ResolveVotes {
    fn command_type(&self) -> &'static str {
        "session.resolve_votes"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to open round 2 after an undecided round 1.
#[derive(Debug, Clone)]
pub struct StartNextRound {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The acting player.
    pub player_id: PlayerId,
}

impl Command for StartNextRound {
    fn command_type(&self) -> &'static str {
        "session.start_next_round"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to reset the session to a fresh lobby.
#[derive(Debug, Clone)]
pub struct ReturnToLobby {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session code.
    pub code: String,
    /// The acting player.
    pub player_id: PlayerId,
}

impl Command for ReturnToLobby {
    fn command_type(&self) -> &'static str {
        "session.return_to_lobby"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_types_are_namespaced() {
        let correlation_id = Uuid::new_v4();
        let command = CastVote {
            correlation_id,
            code: "ABCD".into(),
            player_id: "p1".into(),
            target_id: "p2".into(),
        };

        assert_eq!(command.command_type(), "session.cast_vote");
        assert_eq!(command.correlation_id(), correlation_id);
    }
}
