//! Query handlers for the Session & Synchronization context.
//!
//! Every client derives what it shows from one snapshot. The legal-action
//! set is computed with the same predicates the command handlers check, so
//! a client never offers a button whose command would be ignored.

use std::collections::BTreeMap;

use codeword_core::clock::Clock;
use codeword_core::error::DomainError;
use codeword_core::store::DocumentStore;
use codeword_rules::domain::abilities::resolve_ability;
use codeword_rules::domain::model::{
    AbilityCard, Faction, Phase, PlayerId, PromptKind, Role, Session, SystemMessage,
};
use codeword_rules::domain::tally::{PersonalOutcome, personal_outcome, tally_votes};
use serde::Serialize;

use crate::application::command_handlers;
use crate::config::GameConfig;
use crate::domain::lifecycle::normalize_code;
use crate::domain::phase::{
    check_next_round, check_return_to_lobby, check_start_game, check_toggle_skip,
};
use crate::domain::writes::{check_toggle_ready, check_vote};

/// Something the viewer may do right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegalAction {
    /// Flip lobby readiness.
    ToggleReady,
    /// Deal and start the game.
    StartGame,
    /// Leave the session.
    LeaveSession,
    /// Play the held card on one of `targets`.
    UseAbility {
        /// Valid targets, the viewer included.
        targets: Vec<PlayerId>,
    },
    /// Ask, or stop asking, to end discussion early.
    ToggleSkipDiscussion,
    /// Lock a vote for one of `targets`.
    CastVote {
        /// Active players.
        targets: Vec<PlayerId>,
    },
    /// Open round 2.
    StartNextRound,
    /// Reset to a fresh lobby.
    ReturnToLobby,
}

/// What the viewer knows about another player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    /// Player identity.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Effective host.
    pub is_host: bool,
    /// Lobby readiness.
    pub is_ready: bool,
    /// Whether their vote is locked this round.
    pub has_voted: bool,
    /// Ejected in round 1.
    pub is_eliminated: bool,
    /// Their role, once it is public to the viewer.
    pub role: Option<Role>,
}

/// Progress toward ending discussion early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipProgress {
    /// Players asking to skip.
    pub requested: usize,
    /// Active players; reaching this count ends discussion.
    pub required: usize,
    /// Whether the viewer is among them.
    pub viewer_requested: bool,
}

/// Everything one client renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Join code.
    pub code: String,
    /// The viewer.
    pub viewer_id: PlayerId,
    /// Current phase.
    pub phase: Phase,
    /// 1 or 2.
    pub round: u8,
    /// Whether the viewer runs host duties.
    pub is_host: bool,
    /// Whole seconds left in discussion, rounded up.
    pub seconds_remaining: Option<i64>,
    /// Whether the discussion deadline has passed.
    pub timer_expired: bool,
    /// The viewer's role.
    pub role: Option<Role>,
    /// The viewer's word; empty for the tourist.
    pub secret_word: String,
    /// Word or question.
    pub word_kind: Option<PromptKind>,
    /// The viewer's card.
    pub ability_card: Option<AbilityCard>,
    /// Whether the viewer's card is spent.
    pub is_card_used: bool,
    /// The viewer's vote.
    pub voted_for: Option<PlayerId>,
    /// Whether the viewer's vote is locked.
    pub is_vote_locked: bool,
    /// Whether the viewer was ejected.
    pub is_eliminated: bool,
    /// Everyone in the session, the viewer included.
    pub players: Vec<PlayerSummary>,
    /// Counting votes per candidate.
    pub vote_counts: BTreeMap<PlayerId, u32>,
    /// Skip request progress.
    pub skip: SkipProgress,
    /// Broadcasts in time order.
    pub system_log: Vec<SystemMessage>,
    /// Terminal outcome.
    pub winner: Option<Faction>,
    /// The viewer's result once there is a winner.
    pub outcome: Option<PersonalOutcome>,
    /// Actions the viewer may take now.
    pub legal_actions: Vec<LegalAction>,
}

/// Votes per candidate as the tally will count them.
#[must_use]
pub fn live_vote_counts(session: &Session) -> BTreeMap<PlayerId, u32> {
    tally_votes(session)
}

/// Whole seconds until `deadline`, rounded up and never negative.
#[must_use]
pub fn seconds_until(deadline: i64, now_millis: i64) -> i64 {
    let left = deadline.saturating_sub(now_millis).max(0);
    (left + 999) / 1_000
}

fn role_visible(session: &Session, viewer: &str, id: &str, eliminated: bool) -> bool {
    session.winner.is_some() || viewer == id || eliminated
}

/// The actions `viewer` may take against `session` right now.
#[must_use]
pub fn legal_actions(session: &Session, viewer: &str, config: &GameConfig) -> Vec<LegalAction> {
    let mut actions = Vec::new();
    if session.player(viewer).is_none() {
        return actions;
    }
    if check_toggle_ready(session, viewer).is_ok() {
        actions.push(LegalAction::ToggleReady);
    }
    if check_start_game(session, viewer, config).is_ok() {
        actions.push(LegalAction::StartGame);
    }
    let ability_targets: Vec<PlayerId> = session
        .players
        .keys()
        .filter(|id| resolve_ability(session, viewer, id, 0).is_ok())
        .cloned()
        .collect();
    if !ability_targets.is_empty() {
        actions.push(LegalAction::UseAbility {
            targets: ability_targets,
        });
    }
    if check_toggle_skip(session, viewer).is_ok() {
        actions.push(LegalAction::ToggleSkipDiscussion);
    }
    let vote_targets: Vec<PlayerId> = session
        .players
        .keys()
        .filter(|id| check_vote(session, viewer, id).is_ok())
        .cloned()
        .collect();
    if !vote_targets.is_empty() {
        actions.push(LegalAction::CastVote {
            targets: vote_targets,
        });
    }
    if check_next_round(session, viewer).is_ok() {
        actions.push(LegalAction::StartNextRound);
    }
    if check_return_to_lobby(session, viewer).is_ok() {
        actions.push(LegalAction::ReturnToLobby);
    }
    actions.push(LegalAction::LeaveSession);
    actions
}

/// Builds the view of `session` for `viewer`, or `None` if the viewer is
/// not in it.
#[must_use]
pub fn player_view(
    session: &Session,
    viewer: &str,
    now_millis: i64,
    config: &GameConfig,
) -> Option<PlayerView> {
    let me = session.player(viewer)?;
    let deadline = session
        .timer_end_time
        .filter(|_| session.phase == Phase::Discussion);

    let players = session
        .players
        .values()
        .map(|p| PlayerSummary {
            id: p.id.clone(),
            name: p.name.clone(),
            is_host: session.is_effective_host(&p.id),
            is_ready: p.is_ready,
            has_voted: p.is_vote_locked,
            is_eliminated: p.is_eliminated,
            role: p
                .role
                .filter(|_| role_visible(session, viewer, &p.id, p.is_eliminated)),
        })
        .collect();

    Some(PlayerView {
        code: session.code.clone(),
        viewer_id: me.id.clone(),
        phase: session.phase,
        round: session.round,
        is_host: session.is_effective_host(viewer),
        seconds_remaining: deadline.map(|d| seconds_until(d, now_millis)),
        timer_expired: deadline.is_some_and(|d| now_millis >= d),
        role: me.role,
        secret_word: me.secret_word.clone(),
        word_kind: session.word_kind,
        ability_card: me.ability_card,
        is_card_used: me.is_card_used,
        voted_for: me.voted_for.clone(),
        is_vote_locked: me.is_vote_locked,
        is_eliminated: me.is_eliminated,
        players,
        vote_counts: live_vote_counts(session),
        skip: SkipProgress {
            requested: session.votes_to_skip_discussion.len(),
            required: session.active_count(),
            viewer_requested: session.votes_to_skip_discussion.contains(viewer),
        },
        system_log: session.system_log().cloned().collect(),
        winner: session.winner,
        outcome: personal_outcome(session, viewer),
        legal_actions: legal_actions(session, viewer, config),
    })
}

/// Reads a session and builds the view for `viewer`.
///
/// Returns `Ok(None)` if the viewer is no longer in the session.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist.
/// Returns `DomainError::Infrastructure` if the read or decoding fails.
pub async fn get_player_view(
    code: &str,
    viewer: &str,
    clock: &dyn Clock,
    config: &GameConfig,
    store: &dyn DocumentStore,
) -> Result<Option<PlayerView>, DomainError> {
    let code = normalize_code(code);
    let Some(session) = command_handlers::load_session(store, &code).await? else {
        return Err(DomainError::SessionNotFound(code));
    };
    Ok(player_view(&session, viewer, clock.now_millis(), config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use codeword_rules::domain::model::Player;
    use codeword_test_support::{FailingDocumentStore, FixedClock, RecordingDocumentStore};

    const NOW: i64 = 1_768_471_200_000;

    fn game(phase: Phase) -> Session {
        let mut session = Session::new("ABCD", Player::new("p1", "Ana", true));
        for (id, name) in [("p2", "Bo"), ("p3", "Cy"), ("p4", "Di")] {
            session.players.insert(id.into(), Player::new(id, name, false));
        }
        for (id, role) in [
            ("p1", Role::Spy),
            ("p2", Role::Local),
            ("p3", Role::Local),
            ("p4", Role::Tourist),
        ] {
            let player = session.players.get_mut(id).unwrap();
            player.role = Some(role);
            player.secret_word = if role == Role::Tourist {
                String::new()
            } else {
                format!("word-{id}")
            };
        }
        session.phase = phase;
        session.timer_end_time = Some(NOW + 61_500);
        session
    }

    #[test]
    fn test_seconds_until_rounds_up_and_clamps() {
        assert_eq!(seconds_until(NOW + 61_500, NOW), 62);
        assert_eq!(seconds_until(NOW + 1_000, NOW), 1);
        assert_eq!(seconds_until(NOW, NOW + 5), 0);
    }

    #[test]
    fn test_roles_hidden_until_public() {
        // Arrange
        let mut session = game(Phase::Discussion);
        session.players.get_mut("p3").unwrap().is_eliminated = true;

        // Act
        let view = player_view(&session, "p2", NOW, &GameConfig::default()).unwrap();

        // Assert
        let roles: Vec<_> = view.players.iter().map(|p| (p.id.as_str(), p.role)).collect();
        assert_eq!(
            roles,
            vec![
                ("p1", None),
                ("p2", Some(Role::Local)),
                ("p3", Some(Role::Local)),
                ("p4", None),
            ]
        );
        assert_eq!(view.secret_word, "word-p2");
        assert_eq!(view.seconds_remaining, Some(62));
        assert!(!view.timer_expired);
    }

    #[test]
    fn test_winner_reveals_every_role_and_outcome() {
        // Arrange
        let mut session = game(Phase::Results);
        session.winner = Some(Faction::Locals);

        // Act
        let tourist = player_view(&session, "p4", NOW, &GameConfig::default()).unwrap();
        let spy = player_view(&session, "p1", NOW, &GameConfig::default()).unwrap();

        // Assert
        assert!(tourist.players.iter().all(|p| p.role.is_some()));
        assert_eq!(tourist.outcome, Some(PersonalOutcome::Victory));
        assert_eq!(spy.outcome, Some(PersonalOutcome::Defeat));
        assert!(spy.seconds_remaining.is_none());
        assert!(spy.legal_actions.contains(&LegalAction::ReturnToLobby));
        assert!(!spy.legal_actions.contains(&LegalAction::StartNextRound));
    }

    #[test]
    fn test_vote_counts_exclude_silenced_voters() {
        let mut session = game(Phase::Voting);
        for (voter, target) in [("p1", "p2"), ("p2", "p1"), ("p3", "p1")] {
            let player = session.players.get_mut(voter).unwrap();
            player.voted_for = Some(target.into());
            player.is_vote_locked = true;
        }
        session.players.get_mut("p3").unwrap().is_silenced = true;

        let view = player_view(&session, "p4", NOW, &GameConfig::default()).unwrap();

        assert_eq!(view.vote_counts.get("p1"), Some(&1));
        assert_eq!(view.vote_counts.get("p2"), Some(&1));
        assert_eq!(
            view.legal_actions,
            vec![
                LegalAction::CastVote {
                    targets: vec!["p1".into(), "p2".into(), "p3".into(), "p4".into()]
                },
                LegalAction::ReturnToLobby,
                LegalAction::LeaveSession,
            ]
        );
    }

    #[test]
    fn test_discussion_actions_offer_card_and_skip() {
        let mut session = game(Phase::Discussion);
        session.players.get_mut("p2").unwrap().ability_card = Some(AbilityCard::Radar);
        session.votes_to_skip_discussion.insert("p2".into());

        let view = player_view(&session, "p2", NOW + 61_500, &GameConfig::default()).unwrap();

        assert!(view.timer_expired);
        assert_eq!(view.seconds_remaining, Some(0));
        assert_eq!(
            view.skip,
            SkipProgress {
                requested: 1,
                required: 4,
                viewer_requested: true
            }
        );
        assert_eq!(
            view.legal_actions[0],
            LegalAction::UseAbility {
                targets: vec!["p1".into(), "p2".into(), "p3".into(), "p4".into()]
            }
        );
        assert_eq!(view.legal_actions[1], LegalAction::ToggleSkipDiscussion);
    }

    #[test]
    fn test_lobby_host_may_start_once_everyone_is_ready() {
        let mut session = Session::new("ABCD", Player::new("p1", "Ana", true));
        for id in ["p2", "p3"] {
            session.players.insert(id.into(), Player::new(id, id, false));
        }
        for player in session.players.values_mut() {
            player.is_ready = true;
        }

        let host = legal_actions(&session, "p1", &GameConfig::default());
        let guest = legal_actions(&session, "p2", &GameConfig::default());

        assert_eq!(
            host,
            vec![
                LegalAction::ToggleReady,
                LegalAction::StartGame,
                LegalAction::LeaveSession
            ]
        );
        assert_eq!(guest, vec![LegalAction::ToggleReady, LegalAction::LeaveSession]);
        assert!(legal_actions(&session, "ghost", &GameConfig::default()).is_empty());
    }

    #[test]
    fn test_legal_action_serializes_with_tag() {
        let action = LegalAction::CastVote {
            targets: vec!["p2".into()],
        };

        let value = serde_json::to_value(&action).unwrap();

        assert_eq!(value["action"], "CAST_VOTE");
        assert_eq!(value["targets"][0], "p2");
    }

    #[tokio::test]
    async fn test_get_player_view_reads_snapshot() {
        // Arrange
        let store = RecordingDocumentStore::new(Some(game(Phase::Discussion).to_value().unwrap()));
        let clock = FixedClock(Utc.timestamp_millis_opt(NOW).unwrap());

        // Act
        let view = get_player_view("abcd", "p1", &clock, &GameConfig::default(), &store)
            .await
            .unwrap()
            .unwrap();

        // Assert
        assert_eq!(view.code, "ABCD");
        assert!(view.is_host);
        assert_eq!(view.role, Some(Role::Spy));
    }

    #[tokio::test]
    async fn test_get_player_view_for_departed_player_is_none() {
        let store = RecordingDocumentStore::new(Some(game(Phase::Lobby).to_value().unwrap()));
        let clock = FixedClock(Utc.timestamp_millis_opt(NOW).unwrap());

        let view = get_player_view("ABCD", "p9", &clock, &GameConfig::default(), &store)
            .await
            .unwrap();

        assert!(view.is_none());
    }

    #[tokio::test]
    async fn test_get_player_view_missing_session_returns_not_found() {
        let store = RecordingDocumentStore::new(None);
        let clock = FixedClock(Utc.timestamp_millis_opt(NOW).unwrap());

        let result = get_player_view("ABCD", "p1", &clock, &GameConfig::default(), &store).await;

        assert!(matches!(result, Err(DomainError::SessionNotFound(code)) if code == "ABCD"));
    }

    #[tokio::test]
    async fn test_get_player_view_propagates_store_failure() {
        let clock = FixedClock(Utc.timestamp_millis_opt(NOW).unwrap());

        let result = get_player_view(
            "ABCD",
            "p1",
            &clock,
            &GameConfig::default(),
            &FailingDocumentStore,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
