//! Session creation, membership, and join codes.

use codeword_core::error::DomainError;
use codeword_core::rng::{DeterministicRng, pick_index};
use codeword_rules::domain::model::{Phase, Player, Session};

use super::outcome::IgnoredReason;
use super::phase::close_discussion_on_quorum;

/// Letters a join code is drawn from. `I` and `O` are left out so codes
/// read unambiguously aloud.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Join code length.
pub const CODE_LENGTH: usize = 4;

/// Longest display name accepted.
pub const MAX_NAME_CHARS: usize = 24;

/// Draws a fresh join code.
pub fn generate_code(rng: &mut dyn DeterministicRng) -> String {
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[pick_index(CODE_ALPHABET.len(), rng)]))
        .collect()
}

/// Canonical form of a typed join code.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Checks a player identity and display name, returning the trimmed name.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty or overlong name, or an
/// identity that is empty or contains `/`.
pub fn validate_member(player_id: &str, name: &str) -> Result<String, DomainError> {
    if player_id.is_empty() || player_id.contains('/') {
        return Err(DomainError::Validation(format!(
            "invalid player id: {player_id:?}"
        )));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("name must not be empty".to_owned()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(DomainError::Validation(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_owned())
}

/// A new lobby owned by its creator.
#[must_use]
pub fn new_session(code: &str, player_id: &str, name: &str) -> Session {
    Session::new(code, Player::new(player_id, name, true))
}

/// What joining does to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinPlan {
    /// Commit this session with the new player added.
    Add(Session),
    /// The caller is already a member; their record stays as it is.
    Rejoin,
}

/// Adds a player to the lobby.
///
/// # Errors
///
/// Returns `DomainError::GameInProgress` if the game has started and the
/// caller is not already a member.
pub fn plan_join(session: &Session, player_id: &str, name: &str) -> Result<JoinPlan, DomainError> {
    if session.players.contains_key(player_id) {
        return Ok(JoinPlan::Rejoin);
    }
    if session.phase != Phase::Lobby {
        return Err(DomainError::GameInProgress(session.code.clone()));
    }
    let mut next = session.clone();
    next.players
        .insert(player_id.to_owned(), Player::new(player_id, name, false));
    Ok(JoinPlan::Add(next))
}

/// Removes a player, withdraws their skip request, and hands the host role
/// to the smallest remaining identity if they held it. A discussion whose
/// remaining players have all asked to skip moves on to voting.
///
/// A session left with no players should be deleted by the caller.
///
/// # Errors
///
/// Returns `IgnoredReason::NotAMember` if the player already left.
pub fn plan_leave(session: &Session, player_id: &str) -> Result<Session, IgnoredReason> {
    if !session.players.contains_key(player_id) {
        return Err(IgnoredReason::NotAMember);
    }
    let mut next = session.clone();
    next.players.remove(player_id);
    next.votes_to_skip_discussion.remove(player_id);

    if next.host_id == player_id
        && let Some(successor) = next.players.keys().next().cloned()
    {
        if let Some(player) = next.players.get_mut(&successor) {
            player.is_host = true;
        }
        next.host_id = successor;
    }
    close_discussion_on_quorum(&mut next);
    Ok(next)
}
