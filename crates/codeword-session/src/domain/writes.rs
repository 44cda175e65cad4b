//! Direct-write plans.
//!
//! These operations only ever touch fields the acting client owns, its own
//! readiness and its own vote. They skip the transaction and write the
//! fields in one `update`.

use codeword_core::store::{DocPath, FieldWrite};
use codeword_rules::domain::model::{Phase, Session};
use uuid::Uuid;

use super::outcome::IgnoredReason;
use super::phase::{require_active, require_member, require_phase};

/// Path to a player's field, e.g. `players/p1/isReady`.
#[must_use]
pub fn player_field(player_id: &str, field: &str) -> DocPath {
    DocPath::root().child("players").child(player_id).child(field)
}

/// A unique message key that sorts by creation time.
#[must_use]
pub fn push_key(now_millis: i64) -> String {
    format!("{:013}-{}", now_millis.max(0), Uuid::new_v4().simple())
}

/// # Errors
///
/// Returns the first unmet precondition for flipping readiness.
pub fn check_toggle_ready(session: &Session, actor: &str) -> Result<(), IgnoredReason> {
    require_phase(session, Phase::Lobby)?;
    require_member(session, actor)?;
    Ok(())
}

/// Flips the actor's own `isReady`.
///
/// # Errors
///
/// Returns the first unmet precondition.
pub fn toggle_ready_writes(session: &Session, actor: &str) -> Result<Vec<FieldWrite>, IgnoredReason> {
    check_toggle_ready(session, actor)?;
    let player = require_member(session, actor)?;
    Ok(vec![FieldWrite {
        path: player_field(actor, "isReady"),
        value: (!player.is_ready).into(),
    }])
}

/// # Errors
///
/// Returns the first unmet precondition for voting for `target`.
pub fn check_vote(session: &Session, actor: &str, target: &str) -> Result<(), IgnoredReason> {
    require_phase(session, Phase::Voting)?;
    let voter = require_active(session, actor)?;
    if voter.is_vote_locked {
        return Err(IgnoredReason::VoteAlreadyLocked);
    }
    if !session.player(target).is_some_and(|p| p.is_active()) {
        return Err(IgnoredReason::InvalidTarget);
    }
    Ok(())
}

/// Records and locks the actor's vote.
///
/// # Errors
///
/// Returns the first unmet precondition.
pub fn vote_writes(
    session: &Session,
    actor: &str,
    target: &str,
) -> Result<Vec<FieldWrite>, IgnoredReason> {
    check_vote(session, actor, target)?;
    Ok(vec![
        FieldWrite {
            path: player_field(actor, "votedFor"),
            value: target.into(),
        },
        FieldWrite {
            path: player_field(actor, "isVoteLocked"),
            value: true.into(),
        },
    ])
}
