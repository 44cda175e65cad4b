//! Simulated players.
//!
//! A bot is an ordinary client: it watches the session snapshot, performs
//! any host duty that is due, and otherwise picks one of the actions its
//! view says are legal.

use codeword_core::error::DomainError;
use codeword_core::rng::{DeterministicRng, StdRandom, pick_index};
use codeword_rules::domain::model::{AbilityCard, Faction, PlayerId, Session};
use codeword_session::application::command_handlers::{
    CommandOutcome, handle_cast_vote, handle_start_game, handle_start_next_round,
    handle_toggle_ready, handle_toggle_skip_discussion, handle_use_ability,
};
use codeword_session::application::host_duties::{evaluate_host_duties, run_host_duty};
use codeword_session::application::query_handlers::{LegalAction, PlayerView, player_view};
use codeword_session::domain::commands::{
    CastVote, StartGame, StartNextRound, ToggleReady, ToggleSkipDiscussion, UseAbility,
};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::SimError;
use crate::state::SimState;

/// One move a bot has decided on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotStep {
    /// Mark itself ready.
    ToggleReady,
    /// Deal the game.
    StartGame,
    /// Play its card on the given player.
    UseAbility(PlayerId),
    /// Ask to end discussion.
    ToggleSkip,
    /// Lock a vote for the given player.
    CastVote(PlayerId),
    /// Open round 2.
    StartNextRound,
}

/// Picks a target other than `me` when there is one.
fn pick_target(targets: &[PlayerId], me: &str, rng: &mut dyn DeterministicRng) -> Option<PlayerId> {
    let others: Vec<&PlayerId> = targets.iter().filter(|t| t.as_str() != me).collect();
    let pool: Vec<&PlayerId> = if others.is_empty() {
        targets.iter().collect()
    } else {
        others
    };
    if pool.is_empty() {
        return None;
    }
    Some(pool[pick_index(pool.len(), rng)].clone())
}

/// Decides what the bot does with `view`, if anything.
///
/// A spy holding SPOOF traps itself so a later scan clears it.
pub fn choose_step(
    view: &PlayerView,
    skip_discussion: bool,
    rng: &mut dyn DeterministicRng,
) -> Option<BotStep> {
    let me = view.viewer_id.as_str();
    let ready = view.players.iter().any(|p| p.id == me && p.is_ready);
    for action in &view.legal_actions {
        match action {
            LegalAction::ToggleReady if !ready => return Some(BotStep::ToggleReady),
            LegalAction::StartGame => return Some(BotStep::StartGame),
            LegalAction::UseAbility { targets } => {
                let target = if view.ability_card == Some(AbilityCard::Spoof)
                    && targets.iter().any(|t| t == me)
                {
                    Some(me.to_owned())
                } else {
                    pick_target(targets, me, rng)
                };
                if let Some(target) = target {
                    return Some(BotStep::UseAbility(target));
                }
            }
            LegalAction::ToggleSkipDiscussion if skip_discussion && !view.skip.viewer_requested => {
                return Some(BotStep::ToggleSkip);
            }
            LegalAction::CastVote { targets } => {
                if let Some(target) = pick_target(targets, me, rng) {
                    return Some(BotStep::CastVote(target));
                }
            }
            LegalAction::StartNextRound => return Some(BotStep::StartNextRound),
            _ => {}
        }
    }
    None
}

async fn perform(
    state: &SimState,
    code: &str,
    player_id: &str,
    step: BotStep,
) -> Result<CommandOutcome, DomainError> {
    let correlation_id = Uuid::new_v4();
    let code = code.to_owned();
    let player_id = player_id.to_owned();
    let store = state.store.as_ref();
    let clock = state.clock.as_ref();
    match step {
        BotStep::ToggleReady => {
            let command = ToggleReady {
                correlation_id,
                code,
                player_id,
            };
            handle_toggle_ready(&command, store).await
        }
        BotStep::StartGame => {
            let command = StartGame {
                correlation_id,
                code,
                player_id,
            };
            handle_start_game(&command, clock, state.rng.as_ref(), store, &state.config).await
        }
        BotStep::UseAbility(target_id) => {
            let command = UseAbility {
                correlation_id,
                code,
                player_id,
                target_id,
            };
            handle_use_ability(&command, clock, store).await
        }
        BotStep::ToggleSkip => {
            let command = ToggleSkipDiscussion {
                correlation_id,
                code,
                player_id,
            };
            handle_toggle_skip_discussion(&command, store).await
        }
        BotStep::CastVote(target_id) => {
            let command = CastVote {
                correlation_id,
                code,
                player_id,
                target_id,
            };
            handle_cast_vote(&command, store).await
        }
        BotStep::StartNextRound => {
            let command = StartNextRound {
                correlation_id,
                code,
                player_id,
            };
            handle_start_next_round(&command, clock, store, &state.config).await
        }
    }
}

/// Plays until the session has a winner.
///
/// Each pass acts on the newest snapshot. After an applied command the bot
/// looks again at once; otherwise it waits for the next snapshot or poll
/// tick, whichever comes first.
///
/// # Errors
///
/// Returns `SimError` if the session disappears, the bot is removed from
/// it, or a handler fails.
#[instrument(skip(state, rng), fields(%code, %player_id))]
pub async fn run_bot(
    state: SimState,
    code: String,
    player_id: PlayerId,
    skip_discussion: bool,
    mut rng: StdRandom,
) -> Result<Faction, SimError> {
    let mut subscription = state.store.subscribe(&code).await?;
    let mut tick = interval(state.config.poll_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let Some(snapshot) = subscription.current() else {
            return Err(SimError::SessionVanished(code));
        };
        let session = Session::from_value((*snapshot).clone()).map_err(DomainError::from)?;
        if let Some(winner) = session.winner {
            debug!(?winner, "game over");
            return Ok(winner);
        }

        let now = state.clock.now_millis();
        let outcome = if let Some(duty) = evaluate_host_duties(&session, &player_id, now, &state.config) {
            Some(
                run_host_duty(
                    duty,
                    &code,
                    &player_id,
                    state.clock.as_ref(),
                    state.store.as_ref(),
                    &state.config,
                )
                .await?,
            )
        } else {
            let Some(view) = player_view(&session, &player_id, now, &state.config) else {
                return Err(SimError::Evicted { code, player_id });
            };
            match choose_step(&view, skip_discussion, &mut rng) {
                Some(step) => {
                    debug!(?step, phase = %view.phase, "acting");
                    Some(perform(&state, &code, &player_id, step).await?)
                }
                None => None,
            }
        };
        if outcome.is_some_and(|o| o.is_applied()) {
            continue;
        }

        tokio::select! {
            changed = subscription.changed() => {
                if changed.is_none() {
                    return Err(SimError::SessionVanished(code));
                }
            }
            _ = tick.tick() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeword_rules::domain::model::{Phase, Player, Role};
    use codeword_session::config::GameConfig;
    use codeword_test_support::{MockRng, SequenceRng};

    const NOW: i64 = 1_768_471_200_000;

    fn table(phase: Phase) -> Session {
        let mut session = Session::new("ABCD", Player::new("p1", "Ana", true));
        for id in ["p2", "p3"] {
            session.players.insert(id.into(), Player::new(id, id, false));
        }
        for (id, role) in [("p1", Role::Spy), ("p2", Role::Local), ("p3", Role::Local)] {
            session.players.get_mut(id).unwrap().role = Some(role);
        }
        session.phase = phase;
        session
    }

    fn view(session: &Session, viewer: &str) -> PlayerView {
        player_view(session, viewer, NOW, &GameConfig::default()).unwrap()
    }

    #[test]
    fn test_lobby_bot_readies_then_host_starts() {
        let mut session = table(Phase::Lobby);

        assert_eq!(
            choose_step(&view(&session, "p2"), true, &mut MockRng),
            Some(BotStep::ToggleReady)
        );

        for player in session.players.values_mut() {
            player.is_ready = true;
        }
        assert_eq!(
            choose_step(&view(&session, "p1"), true, &mut MockRng),
            Some(BotStep::StartGame)
        );
        assert_eq!(choose_step(&view(&session, "p2"), true, &mut MockRng), None);
    }

    #[test]
    fn test_spy_spoofs_itself() {
        let mut session = table(Phase::Discussion);
        session.players.get_mut("p1").unwrap().ability_card = Some(AbilityCard::Spoof);

        let step = choose_step(&view(&session, "p1"), true, &mut MockRng);

        assert_eq!(step, Some(BotStep::UseAbility("p1".into())));
    }

    #[test]
    fn test_discussion_bot_skips_only_when_configured() {
        let session = table(Phase::Discussion);

        assert_eq!(
            choose_step(&view(&session, "p2"), true, &mut MockRng),
            Some(BotStep::ToggleSkip)
        );
        assert_eq!(choose_step(&view(&session, "p2"), false, &mut MockRng), None);
    }

    #[test]
    fn test_voting_bot_never_votes_for_itself() {
        let session = table(Phase::Voting);
        let mut rng = SequenceRng::new(vec![1]);

        let step = choose_step(&view(&session, "p1"), true, &mut rng);

        assert_eq!(step, Some(BotStep::CastVote("p3".into())));
    }
}
