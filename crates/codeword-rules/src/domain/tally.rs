//! Vote tally and win resolution.

use std::collections::BTreeMap;

use serde::Serialize;

use super::model::{Faction, PlayerId, Role, Session};

/// Counts counting votes per candidate.
///
/// Only active, unsilenced players with a vote contribute. The same counts
/// drive the live vote display, so the two can never disagree.
#[must_use]
pub fn tally_votes(session: &Session) -> BTreeMap<PlayerId, u32> {
    let mut counts: BTreeMap<PlayerId, u32> = BTreeMap::new();
    for voter in session.players.values().filter(|p| p.has_counting_vote()) {
        if let Some(candidate) = &voter.voted_for {
            *counts.entry(candidate.clone()).or_default() += 1;
        }
    }
    counts
}

/// The uniquely most-voted candidate, or `None` on a tie or an empty tally.
#[must_use]
pub fn find_victim(counts: &BTreeMap<PlayerId, u32>) -> Option<PlayerId> {
    let mut max = 0;
    let mut leader: Option<&PlayerId> = None;
    for (candidate, &count) in counts {
        if count > max {
            max = count;
            leader = Some(candidate);
        } else if count == max {
            leader = None;
        }
    }
    leader.cloned()
}

/// Outcome of one round's vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResolution {
    /// Round that was resolved.
    pub round: u8,
    /// Uniquely most-voted player still in the session.
    pub victim: Option<PlayerId>,
    /// The victim's role.
    pub victim_role: Option<Role>,
    /// Terminal outcome, if any.
    pub winner: Option<Faction>,
    /// Player to mark eliminated; set only when the game continues.
    pub eliminated: Option<PlayerId>,
}

/// Resolves the current round of `session` without mutating it.
///
/// Ejecting the spy wins for the locals and ejecting the joker wins for the
/// joker in either round. Any other round-1 outcome continues the game,
/// eliminating the victim if there is one; any other round-2 outcome is a
/// spy win.
#[must_use]
pub fn resolve_round(session: &Session) -> RoundResolution {
    let victim = find_victim(&tally_votes(session)).filter(|id| session.players.contains_key(id));
    let victim_role = victim
        .as_deref()
        .and_then(|id| session.player(id))
        .and_then(|p| p.role);

    let winner = match (victim_role, session.round) {
        (Some(Role::Spy), _) => Some(Faction::Locals),
        (Some(Role::Joker), _) => Some(Faction::Joker),
        (_, 1) => None,
        _ => Some(Faction::Spy),
    };
    let eliminated = if winner.is_none() { victim.clone() } else { None };

    RoundResolution {
        round: session.round,
        victim,
        victim_role,
        winner,
        eliminated,
    }
}

/// Folds a round resolution into `session`.
///
/// Applying the same resolution twice leaves the session unchanged the
/// second time.
pub fn apply_round_resolution(session: &mut Session, resolution: &RoundResolution) {
    if let Some(winner) = resolution.winner {
        session.winner = Some(winner);
    }
    if let Some(player) = resolution
        .eliminated
        .as_deref()
        .and_then(|id| session.players.get_mut(id))
    {
        player.is_eliminated = true;
    }
}

/// A player's personal result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonalOutcome {
    /// The player's faction won and they were not ejected.
    Victory,
    /// Anything else.
    Defeat,
}

/// The result screen for `player_id`; `None` while the game is undecided
/// or the player is unknown.
#[must_use]
pub fn personal_outcome(session: &Session, player_id: &str) -> Option<PersonalOutcome> {
    let winner = session.winner?;
    let player = session.player(player_id)?;
    if player.is_eliminated {
        return Some(PersonalOutcome::Defeat);
    }
    let won = player.role.is_some_and(|role| role.faction() == winner);
    Some(if won {
        PersonalOutcome::Victory
    } else {
        PersonalOutcome::Defeat
    })
}
