//! Session phase state machine.
//!
//! Each transition is a `check_*` predicate and a `plan_*` function that
//! returns the next session. Plans run inside root transactions, so they
//! see the freshest document and may run more than once; they are pure
//! apart from the RNG draw in [`plan_start_game`].

use codeword_core::rng::DeterministicRng;
use codeword_rules::domain::distribution::distribute;
use codeword_rules::domain::model::{Phase, Player, PlayerId, ScrambleTrap, Session};
use codeword_rules::domain::tally::{apply_round_resolution, resolve_round};

use super::outcome::IgnoredReason;
use crate::config::GameConfig;

/// The actor's record, if they are in the session.
///
/// # Errors
///
/// Returns `IgnoredReason::NotAMember` otherwise.
pub fn require_member<'a>(session: &'a Session, actor: &str) -> Result<&'a Player, IgnoredReason> {
    session.player(actor).ok_or(IgnoredReason::NotAMember)
}

/// The actor's record, if they are in the session and not eliminated.
///
/// # Errors
///
/// Returns `NotAMember` or `Eliminated`.
pub fn require_active<'a>(session: &'a Session, actor: &str) -> Result<&'a Player, IgnoredReason> {
    let player = require_member(session, actor)?;
    if player.is_active() {
        Ok(player)
    } else {
        Err(IgnoredReason::Eliminated)
    }
}

/// # Errors
///
/// Returns `WrongPhase` unless the session is in `expected`.
pub fn require_phase(session: &Session, expected: Phase) -> Result<(), IgnoredReason> {
    if session.phase == expected {
        Ok(())
    } else {
        Err(IgnoredReason::WrongPhase {
            expected,
            actual: session.phase,
        })
    }
}

/// Whether `actor` may perform a deadline-driven duty now.
///
/// The effective host may act once `deadline` has passed; anyone else once
/// it is older than `grace_millis`.
///
/// # Errors
///
/// Returns `NotAMember`, `DeadlineNotReached`, or `NotHost`.
pub fn check_duty(
    session: &Session,
    actor: &str,
    deadline: Option<i64>,
    now_millis: i64,
    grace_millis: i64,
) -> Result<(), IgnoredReason> {
    require_member(session, actor)?;
    let Some(deadline) = deadline else {
        return Err(IgnoredReason::DeadlineNotReached);
    };
    if now_millis < deadline {
        return Err(IgnoredReason::DeadlineNotReached);
    }
    if session.is_effective_host(actor) || now_millis >= deadline.saturating_add(grace_millis) {
        Ok(())
    } else {
        Err(IgnoredReason::NotHost)
    }
}

fn enter(session: &mut Session, next: Phase) {
    debug_assert!(
        session.phase.can_transition_to(next),
        "no edge {} -> {next}",
        session.phase
    );
    session.phase = next;
}

/// # Errors
///
/// Returns the first unmet precondition for starting a game.
pub fn check_start_game(
    session: &Session,
    actor: &str,
    config: &GameConfig,
) -> Result<(), IgnoredReason> {
    require_phase(session, Phase::Lobby)?;
    require_member(session, actor)?;
    if !session.is_effective_host(actor) {
        return Err(IgnoredReason::NotHost);
    }
    let present = session.players.len();
    if present < config.min_players {
        return Err(IgnoredReason::NotEnoughPlayers {
            required: config.min_players,
            present,
        });
    }
    if !session.players.values().all(|p| p.is_ready) {
        return Err(IgnoredReason::PlayersNotReady);
    }
    Ok(())
}

/// Deals a new game and opens the first discussion.
///
/// Every per-game field is reset, so leftovers from an earlier game in the
/// same session cannot leak into this one.
///
/// # Errors
///
/// Returns the first unmet precondition.
pub fn plan_start_game(
    session: &Session,
    actor: &str,
    now_millis: i64,
    config: &GameConfig,
    rng: &mut dyn DeterministicRng,
) -> Result<Session, IgnoredReason> {
    check_start_game(session, actor, config)?;

    let ids: Vec<PlayerId> = session.players.keys().cloned().collect();
    let dealt = distribute(&ids, &session.used_prompt_indices, rng);

    let mut next = session.clone();
    enter(&mut next, Phase::Discussion);
    next.round = 1;
    next.winner = None;
    next.timer_end_time = Some(now_millis.saturating_add(config.discussion_millis));
    next.suspense_end_time = None;
    next.majority_word.clone_from(&dealt.majority_word);
    next.impostor_word.clone_from(&dealt.impostor_word);
    next.word_kind = Some(dealt.kind);
    if next.used_prompt_indices.contains(&dealt.prompt_index) {
        next.used_prompt_indices = vec![dealt.prompt_index];
    } else {
        next.used_prompt_indices.push(dealt.prompt_index);
    }
    next.votes_to_skip_discussion.clear();
    next.system_messages.clear();

    for (id, player) in &mut next.players {
        let assignment = dealt.assignments.get(id);
        player.role = assignment.map(|a| a.role);
        player.secret_word = assignment.map(|a| a.secret_word.clone()).unwrap_or_default();
        player.ability_card = dealt.cards.get(id).copied().flatten();
        player.is_card_used = false;
        player.card_target_id = None;
        player.is_silenced = false;
        player.scramble = ScrambleTrap::Clear;
        player.voted_for = None;
        player.is_vote_locked = false;
        player.is_eliminated = false;
    }
    Ok(next)
}

/// Moves a discussion to voting once every active player has asked to
/// skip. Does nothing in any other phase.
pub(crate) fn close_discussion_on_quorum(next: &mut Session) {
    let active = next.active_count();
    if next.phase == Phase::Discussion
        && active > 0
        && next.votes_to_skip_discussion.len() >= active
    {
        enter(next, Phase::Voting);
        next.timer_end_time = None;
    }
}

/// # Errors
///
/// Returns the first unmet precondition for toggling a skip request.
pub fn check_toggle_skip(session: &Session, actor: &str) -> Result<(), IgnoredReason> {
    require_phase(session, Phase::Discussion)?;
    require_active(session, actor)?;
    Ok(())
}

/// Adds or withdraws the actor's skip request, moving to voting once every
/// active player has asked.
///
/// # Errors
///
/// Returns the first unmet precondition.
pub fn plan_toggle_skip(session: &Session, actor: &str) -> Result<Session, IgnoredReason> {
    check_toggle_skip(session, actor)?;

    let mut next = session.clone();
    if !next.votes_to_skip_discussion.remove(actor) {
        next.votes_to_skip_discussion.insert(actor.to_owned());
    }
    close_discussion_on_quorum(&mut next);
    Ok(next)
}

/// # Errors
///
/// Returns the first unmet precondition for closing discussion.
pub fn check_force_voting(
    session: &Session,
    actor: &str,
    now_millis: i64,
    config: &GameConfig,
) -> Result<(), IgnoredReason> {
    require_phase(session, Phase::Discussion)?;
    check_duty(
        session,
        actor,
        session.timer_end_time,
        now_millis,
        config.host_grace_millis,
    )
}

/// Closes an expired discussion.
///
/// # Errors
///
/// Returns the first unmet precondition.
pub fn plan_force_voting(
    session: &Session,
    actor: &str,
    now_millis: i64,
    config: &GameConfig,
) -> Result<Session, IgnoredReason> {
    check_force_voting(session, actor, now_millis, config)?;

    let mut next = session.clone();
    enter(&mut next, Phase::Voting);
    next.timer_end_time = None;
    Ok(next)
}

/// # Errors
///
/// Returns the first unmet precondition for entering suspense.
pub fn check_begin_suspense(session: &Session, actor: &str) -> Result<(), IgnoredReason> {
    require_phase(session, Phase::Voting)?;
    require_member(session, actor)?;
    if !session.is_effective_host(actor) {
        return Err(IgnoredReason::NotHost);
    }
    if !session.all_active_votes_locked() {
        return Err(IgnoredReason::VotesOutstanding);
    }
    Ok(())
}

/// Starts the suspense pause once every active vote is locked.
///
/// # Errors
///
/// Returns the first unmet precondition.
pub fn plan_begin_suspense(
    session: &Session,
    actor: &str,
    now_millis: i64,
    config: &GameConfig,
) -> Result<Session, IgnoredReason> {
    check_begin_suspense(session, actor)?;

    let mut next = session.clone();
    enter(&mut next, Phase::Suspense);
    next.suspense_end_time = Some(now_millis.saturating_add(config.suspense_millis));
    Ok(next)
}

/// # Errors
///
/// Returns the first unmet precondition for resolving the round.
pub fn check_resolve_votes(
    session: &Session,
    actor: &str,
    now_millis: i64,
    config: &GameConfig,
) -> Result<(), IgnoredReason> {
    require_phase(session, Phase::Suspense)?;
    check_duty(
        session,
        actor,
        session.suspense_end_time,
        now_millis,
        config.host_grace_millis,
    )
}

/// Tallies the round, applies the winner or elimination, and shows the
/// results, all in one step.
///
/// # Errors
///
/// Returns the first unmet precondition.
pub fn plan_resolve_votes(
    session: &Session,
    actor: &str,
    now_millis: i64,
    config: &GameConfig,
) -> Result<Session, IgnoredReason> {
    check_resolve_votes(session, actor, now_millis, config)?;

    let mut next = session.clone();
    let resolution = resolve_round(&next);
    apply_round_resolution(&mut next, &resolution);
    enter(&mut next, Phase::Results);
    next.suspense_end_time = None;
    Ok(next)
}

/// # Errors
///
/// Returns the first unmet precondition for opening round 2.
pub fn check_next_round(session: &Session, actor: &str) -> Result<(), IgnoredReason> {
    require_phase(session, Phase::Results)?;
    require_active(session, actor)?;
    if session.winner.is_some() || session.round != 1 {
        return Err(IgnoredReason::NoFurtherRound);
    }
    Ok(())
}

/// Opens round 2. Silences, scramble traps, and spent cards carry over.
///
/// # Errors
///
/// Returns the first unmet precondition.
pub fn plan_next_round(
    session: &Session,
    actor: &str,
    now_millis: i64,
    config: &GameConfig,
) -> Result<Session, IgnoredReason> {
    check_next_round(session, actor)?;

    let mut next = session.clone();
    enter(&mut next, Phase::Discussion);
    next.round = 2;
    next.timer_end_time = Some(now_millis.saturating_add(config.discussion_millis));
    next.votes_to_skip_discussion.clear();
    for player in next.players.values_mut() {
        player.voted_for = None;
        player.is_vote_locked = false;
    }
    Ok(next)
}

/// # Errors
///
/// Returns the first unmet precondition for resetting to the lobby.
pub fn check_return_to_lobby(session: &Session, actor: &str) -> Result<(), IgnoredReason> {
    require_member(session, actor)?;
    if session.phase == Phase::Lobby {
        return Err(IgnoredReason::AlreadyInLobby);
    }
    Ok(())
}

/// Resets the session to a fresh lobby with the same players and host.
///
/// # Errors
///
/// Returns the first unmet precondition.
pub fn plan_return_to_lobby(session: &Session, actor: &str) -> Result<Session, IgnoredReason> {
    check_return_to_lobby(session, actor)?;

    let mut next = session.clone();
    enter(&mut next, Phase::Lobby);
    next.round = 1;
    next.winner = None;
    next.timer_end_time = None;
    next.suspense_end_time = None;
    next.majority_word.clear();
    next.impostor_word.clear();
    next.word_kind = None;
    next.votes_to_skip_discussion.clear();
    next.system_messages.clear();
    for player in next.players.values_mut() {
        *player = Player::new(player.id.clone(), player.name.clone(), player.is_host);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeword_core::rng::StdRandom;
    use codeword_rules::domain::model::{
        AbilityCard, Faction, Role, SystemMessage, SystemMessageKind,
    };
    use codeword_test_support::MockRng;

    const NOW: i64 = 1_768_471_200_000;

    fn config() -> GameConfig {
        GameConfig::default()
    }

    fn ready_lobby(count: usize) -> Session {
        let mut session = Session::new("ABCD", Player::new("p1", "P1", true));
        for i in 2..=count {
            let id = format!("p{i}");
            session
                .players
                .insert(id.clone(), Player::new(id.clone(), id.to_uppercase(), false));
        }
        for player in session.players.values_mut() {
            player.is_ready = true;
        }
        session
    }

    fn started(count: usize) -> Session {
        plan_start_game(&ready_lobby(count), "p1", NOW, &config(), &mut MockRng).unwrap()
    }

    fn lock_votes(session: &mut Session, votes: &[(&str, &str)]) {
        for (voter, target) in votes {
            let player = session.players.get_mut(*voter).unwrap();
            player.voted_for = Some((*target).to_owned());
            player.is_vote_locked = true;
        }
    }

    #[test]
    fn test_start_game_requires_host_ready_and_enough_players() {
        let mut session = ready_lobby(3);

        assert_eq!(
            check_start_game(&session, "p2", &config()),
            Err(IgnoredReason::NotHost)
        );

        session.players.get_mut("p3").unwrap().is_ready = false;
        assert_eq!(
            check_start_game(&session, "p1", &config()),
            Err(IgnoredReason::PlayersNotReady)
        );

        let small = ready_lobby(2);
        assert_eq!(
            check_start_game(&small, "p1", &config()),
            Err(IgnoredReason::NotEnoughPlayers {
                required: 3,
                present: 2
            })
        );
    }

    #[test]
    fn test_start_game_deals_and_opens_discussion() {
        let mut lobby = ready_lobby(5);
        lobby.system_messages.insert(
            "old".into(),
            SystemMessage {
                kind: SystemMessageKind::RadarResult,
                text: "stale".into(),
                target_id: "p1".into(),
                timestamp: 0,
            },
        );
        lobby.players.get_mut("p2").unwrap().is_eliminated = true;

        let mut rng = StdRandom::seeded(4);

        let session = plan_start_game(&lobby, "p1", NOW, &config(), &mut rng).unwrap();

        assert_eq!(session.phase, Phase::Discussion);
        assert_eq!(session.round, 1);
        assert_eq!(session.timer_end_time, Some(NOW + 420_000));
        assert!(session.system_messages.is_empty());
        assert!(session.players.values().all(|p| p.role.is_some() && p.is_active()));
        assert_eq!(session.used_prompt_indices.len(), 1);
        assert!(session.word_kind.is_some());
        let spies = session
            .players
            .values()
            .filter(|p| p.role == Some(Role::Spy))
            .count();
        assert_eq!(spies, 1);
    }

    #[test]
    fn test_skip_toggle_advances_when_everyone_asks() {
        let mut session = started(3);

        session = plan_toggle_skip(&session, "p1").unwrap();
        session = plan_toggle_skip(&session, "p2").unwrap();
        session = plan_toggle_skip(&session, "p2").unwrap();
        assert_eq!(session.phase, Phase::Discussion);
        assert_eq!(session.votes_to_skip_discussion.len(), 1);

        session = plan_toggle_skip(&session, "p2").unwrap();
        session = plan_toggle_skip(&session, "p3").unwrap();

        assert_eq!(session.phase, Phase::Voting);
        assert!(session.timer_end_time.is_none());
        assert_eq!(
            plan_toggle_skip(&session, "p1"),
            Err(IgnoredReason::WrongPhase {
                expected: Phase::Discussion,
                actual: Phase::Voting
            })
        );
    }

    #[test]
    fn test_force_voting_waits_for_deadline_and_grace() {
        let session = started(3);
        let deadline = NOW + 420_000;

        assert_eq!(
            check_force_voting(&session, "p1", deadline - 1, &config()),
            Err(IgnoredReason::DeadlineNotReached)
        );
        assert!(check_force_voting(&session, "p1", deadline, &config()).is_ok());
        assert_eq!(
            check_force_voting(&session, "p2", deadline + 4_999, &config()),
            Err(IgnoredReason::NotHost)
        );

        let next = plan_force_voting(&session, "p2", deadline + 5_000, &config()).unwrap();
        assert_eq!(next.phase, Phase::Voting);
        assert!(plan_force_voting(&next, "p1", deadline, &config()).is_err());
    }

    #[test]
    fn test_begin_suspense_needs_every_active_vote() {
        let mut session = started(3);
        session = plan_force_voting(&session, "p1", NOW + 420_000, &config()).unwrap();
        lock_votes(&mut session, &[("p1", "p2"), ("p2", "p1")]);

        assert_eq!(
            check_begin_suspense(&session, "p1"),
            Err(IgnoredReason::VotesOutstanding)
        );

        lock_votes(&mut session, &[("p3", "p2")]);
        assert_eq!(
            check_begin_suspense(&session, "p2"),
            Err(IgnoredReason::NotHost)
        );
        let next = plan_begin_suspense(&session, "p1", NOW, &config()).unwrap();

        assert_eq!(next.phase, Phase::Suspense);
        assert_eq!(next.suspense_end_time, Some(NOW + 3_000));
    }

    #[test]
    fn test_round_one_local_ejection_leads_to_round_two() {
        // MockRng deal for three players: p1 is the spy, p2 and p3 locals.
        let mut session = started(3);
        session.players.get_mut("p2").unwrap().is_silenced = true;
        session = plan_force_voting(&session, "p1", NOW + 420_000, &config()).unwrap();
        lock_votes(&mut session, &[("p1", "p3"), ("p2", "p1"), ("p3", "p3")]);
        session = plan_begin_suspense(&session, "p1", NOW, &config()).unwrap();

        session = plan_resolve_votes(&session, "p1", NOW + 3_000, &config()).unwrap();

        assert_eq!(session.phase, Phase::Results);
        assert!(session.winner.is_none());
        assert!(session.players["p3"].is_eliminated);

        session = plan_next_round(&session, "p2", NOW + 10_000, &config()).unwrap();

        assert_eq!(session.phase, Phase::Discussion);
        assert_eq!(session.round, 2);
        assert!(session.players["p2"].is_silenced);
        assert!(session.players.values().all(|p| p.voted_for.is_none()));
        assert_eq!(
            check_next_round(&session, "p3"),
            Err(IgnoredReason::WrongPhase {
                expected: Phase::Results,
                actual: Phase::Discussion
            })
        );
    }

    #[test]
    fn test_resolving_twice_is_a_no_op() {
        let mut session = started(3);
        session = plan_force_voting(&session, "p1", NOW + 420_000, &config()).unwrap();
        lock_votes(&mut session, &[("p1", "p2"), ("p2", "p1"), ("p3", "p1")]);
        session = plan_begin_suspense(&session, "p1", NOW, &config()).unwrap();

        let resolved = plan_resolve_votes(&session, "p1", NOW + 3_000, &config()).unwrap();

        assert_eq!(resolved.winner, Some(Faction::Locals));
        assert!(plan_resolve_votes(&resolved, "p1", NOW + 3_000, &config()).is_err());
        assert_eq!(
            check_next_round(&resolved, "p2"),
            Err(IgnoredReason::NoFurtherRound)
        );
    }

    #[test]
    fn test_return_to_lobby_clears_every_game_field() {
        let mut session = started(4);
        session.players.get_mut("p2").unwrap().is_silenced = true;
        session.players.get_mut("p3").unwrap().scramble.arm();
        session.players.get_mut("p4").unwrap().is_eliminated = true;
        session.winner = Some(Faction::Spy);
        session.phase = Phase::Results;

        let lobby = plan_return_to_lobby(&session, "p4").unwrap();

        assert_eq!(lobby.phase, Phase::Lobby);
        assert_eq!(lobby.round, 1);
        assert!(lobby.winner.is_none());
        assert!(lobby.system_messages.is_empty());
        assert_eq!(lobby.host_id, "p1");
        for player in lobby.players.values() {
            let fresh = Player::new(player.id.clone(), player.name.clone(), player.is_host);
            assert_eq!(player, &fresh);
        }
        assert!(lobby.players["p1"].is_host);
        assert_eq!(
            plan_return_to_lobby(&lobby, "p1"),
            Err(IgnoredReason::AlreadyInLobby)
        );
    }

    #[test]
    fn test_start_game_deals_cards_to_mock_spy() {
        let session = started(3);

        assert_eq!(session.players["p1"].role, Some(Role::Spy));
        assert_eq!(session.players["p1"].ability_card, Some(AbilityCard::Spoof));
    }
}
