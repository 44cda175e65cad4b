//! Host duties.
//!
//! Timed and all-voted transitions have no single trigger, so every client
//! evaluates them on each snapshot and on a poll tick. The effective host
//! runs them as soon as they are due; any other client steps in once a
//! deadline is older than the grace period. The transitions are
//! transactions, so a duplicate attempt is ignored.

use std::fmt;

use codeword_core::clock::Clock;
use codeword_core::error::DomainError;
use codeword_core::store::DocumentStore;
use codeword_rules::domain::model::Session;
use tracing::instrument;
use uuid::Uuid;

use crate::application::command_handlers::{
    CommandOutcome, handle_begin_suspense, handle_force_voting, handle_resolve_votes,
};
use crate::config::GameConfig;
use crate::domain::commands::{BeginSuspense, ForceVoting, ResolveVotes};
use crate::domain::phase::{check_begin_suspense, check_force_voting, check_resolve_votes};

/// A transition some client has to trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostDuty {
    /// Every active vote is locked.
    BeginSuspense,
    /// The suspense pause is over.
    ResolveVotes,
    /// The discussion timer ran out.
    ForceVoting,
}

impl fmt::Display for HostDuty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeginSuspense => "begin_suspense",
            Self::ResolveVotes => "resolve_votes",
            Self::ForceVoting => "force_voting",
        };
        f.write_str(name)
    }
}

/// The duty `viewer` should perform now, if any.
#[must_use]
pub fn evaluate_host_duties(
    session: &Session,
    viewer: &str,
    now_millis: i64,
    config: &GameConfig,
) -> Option<HostDuty> {
    if check_begin_suspense(session, viewer).is_ok() {
        Some(HostDuty::BeginSuspense)
    } else if check_resolve_votes(session, viewer, now_millis, config).is_ok() {
        Some(HostDuty::ResolveVotes)
    } else if check_force_voting(session, viewer, now_millis, config).is_ok() {
        Some(HostDuty::ForceVoting)
    } else {
        None
    }
}

/// Performs `duty` on behalf of `player_id`.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(skip(clock, store, config), fields(%duty))]
pub async fn run_host_duty(
    duty: HostDuty,
    code: &str,
    player_id: &str,
    clock: &dyn Clock,
    store: &dyn DocumentStore,
    config: &GameConfig,
) -> Result<CommandOutcome, DomainError> {
    let correlation_id = Uuid::new_v4();
    let code = code.to_owned();
    let player_id = player_id.to_owned();
    match duty {
        HostDuty::BeginSuspense => {
            let command = BeginSuspense {
                correlation_id,
                code,
                player_id,
            };
            handle_begin_suspense(&command, clock, store, config).await
        }
        HostDuty::ResolveVotes => {
            let command = ResolveVotes {
                correlation_id,
                code,
                player_id,
            };
            handle_resolve_votes(&command, clock, store, config).await
        }
        HostDuty::ForceVoting => {
            let command = ForceVoting {
                correlation_id,
                code,
                player_id,
            };
            handle_force_voting(&command, clock, store, config).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use codeword_core::store::DocPath;
    use codeword_doc_store::MemoryDocumentStore;
    use codeword_rules::domain::model::{Phase, Player};
    use codeword_test_support::FixedClock;

    const NOW: i64 = 1_768_471_200_000;

    fn session(phase: Phase) -> Session {
        let mut session = Session::new("ABCD", Player::new("p1", "Ana", true));
        for id in ["p2", "p3"] {
            session.players.insert(id.into(), Player::new(id, id, false));
        }
        session.phase = phase;
        session
    }

    fn lock_all(session: &mut Session) {
        for player in session.players.values_mut() {
            player.voted_for = Some("p2".into());
            player.is_vote_locked = true;
        }
    }

    #[test]
    fn test_all_locked_votes_make_host_begin_suspense() {
        let mut voting = session(Phase::Voting);
        lock_all(&mut voting);

        assert_eq!(
            evaluate_host_duties(&voting, "p1", NOW, &GameConfig::default()),
            Some(HostDuty::BeginSuspense)
        );
        assert_eq!(
            evaluate_host_duties(&voting, "p2", NOW, &GameConfig::default()),
            None
        );
    }

    #[test]
    fn test_timer_expiry_falls_back_to_guests_after_grace() {
        let config = GameConfig::default();
        let mut discussion = session(Phase::Discussion);
        discussion.timer_end_time = Some(NOW);

        assert_eq!(
            evaluate_host_duties(&discussion, "p1", NOW - 1, &config),
            None
        );
        assert_eq!(
            evaluate_host_duties(&discussion, "p1", NOW, &config),
            Some(HostDuty::ForceVoting)
        );
        assert_eq!(evaluate_host_duties(&discussion, "p3", NOW, &config), None);
        assert_eq!(
            evaluate_host_duties(&discussion, "p3", NOW + config.host_grace_millis, &config),
            Some(HostDuty::ForceVoting)
        );
    }

    #[test]
    fn test_departed_host_is_replaced_by_smallest_identity() {
        let mut suspense = session(Phase::Suspense);
        suspense.suspense_end_time = Some(NOW);
        suspense.players.remove("p1");

        assert_eq!(
            evaluate_host_duties(&suspense, "p2", NOW, &GameConfig::default()),
            Some(HostDuty::ResolveVotes)
        );
        assert_eq!(
            evaluate_host_duties(&suspense, "p3", NOW, &GameConfig::default()),
            None
        );
    }

    #[tokio::test]
    async fn test_run_host_duty_applies_once() {
        // Arrange
        let store = MemoryDocumentStore::new();
        let mut voting = session(Phase::Voting);
        lock_all(&mut voting);
        store
            .set("ABCD", &DocPath::root(), voting.to_value().unwrap())
            .await
            .unwrap();
        let clock = FixedClock(Utc.timestamp_millis_opt(NOW).unwrap());
        let config = GameConfig::default();

        // Act
        let first = run_host_duty(HostDuty::BeginSuspense, "ABCD", "p1", &clock, &store, &config)
            .await
            .unwrap();
        let second = run_host_duty(HostDuty::BeginSuspense, "ABCD", "p1", &clock, &store, &config)
            .await
            .unwrap();

        // Assert
        assert!(first.is_applied());
        assert!(!second.is_applied());
        let stored = Session::from_value(store.get("ABCD").await.unwrap().unwrap()).unwrap();
        assert_eq!(stored.phase, Phase::Suspense);
        assert_eq!(stored.suspense_end_time, Some(NOW + config.suspense_millis));
    }
}
