//! Command handlers for the Session & Synchronization context.
//!
//! Phase transitions, membership changes, skip toggles, and card plays run
//! as root transactions over the whole session document, so racing clients
//! can never both apply one and a card never lands on a player who has
//! left. Readiness and votes touch only the actor's own fields and go out
//! as a single unconditional `update`.

use std::sync::Mutex;

use codeword_core::clock::Clock;
use codeword_core::command::Command;
use codeword_core::error::DomainError;
use codeword_core::rng::DeterministicRng;
use codeword_core::store::{DocPath, DocumentStore, FieldWrite};
use codeword_rules::domain::abilities::{apply_resolution, resolve_ability};
use codeword_rules::domain::model::Session;
use serde_json::Value;
use tracing::{debug, info, instrument};

pub use crate::domain::outcome::{CommandOutcome, IgnoredReason};

use crate::config::GameConfig;
use crate::domain::commands::{
    BeginSuspense, CastVote, CreateSession, ForceVoting, JoinSession, LeaveSession,
    ResolveVotes, ReturnToLobby, StartGame, StartNextRound, ToggleReady, ToggleSkipDiscussion,
    UseAbility,
};
use crate::domain::lifecycle::{
    JoinPlan, generate_code, new_session, normalize_code, plan_join, plan_leave, validate_member,
};
use crate::domain::phase::{
    plan_begin_suspense, plan_force_voting, plan_next_round, plan_resolve_votes,
    plan_return_to_lobby, plan_start_game, plan_toggle_skip,
};
use crate::domain::writes::{push_key, toggle_ready_writes, vote_writes};

/// Fresh codes drawn before giving up on finding a free one.
pub const MAX_CODE_ATTEMPTS: usize = 10;

/// Why a transaction body declined to commit.
#[derive(Debug)]
enum Abort {
    Ignored(IgnoredReason),
    Failed(DomainError),
}

impl From<IgnoredReason> for Abort {
    fn from(reason: IgnoredReason) -> Self {
        Self::Ignored(reason)
    }
}

impl From<DomainError> for Abort {
    fn from(err: DomainError) -> Self {
        Self::Failed(err)
    }
}

fn record(slot: &Mutex<Option<Abort>>, abort: Option<Abort>) {
    if let Ok(mut guard) = slot.lock() {
        *guard = abort;
    }
}

/// Encodes the next session. A session with nobody left is deleted.
fn encode(session: &Session) -> Result<Value, DomainError> {
    if session.players.is_empty() {
        return Ok(Value::Null);
    }
    Ok(session.to_value()?)
}

/// Runs `plan` against the freshest session inside a root transaction.
///
/// The body may run several times under contention; only the last run's
/// verdict is reported.
async fn transact_session<F>(
    store: &dyn DocumentStore,
    code: &str,
    plan: F,
) -> Result<CommandOutcome, DomainError>
where
    F: Fn(&Session) -> Result<Session, Abort> + Send + Sync,
{
    let slot: Mutex<Option<Abort>> = Mutex::new(None);
    let body = |current: Option<&Value>| -> Option<Value> {
        let verdict = current
            .ok_or(Abort::Ignored(IgnoredReason::SessionMissing))
            .and_then(|value| Session::from_value(value.clone()).map_err(|e| Abort::Failed(e.into())))
            .and_then(|session| plan(&session))
            .and_then(|next| encode(&next).map_err(Abort::Failed));
        match verdict {
            Ok(next) => {
                record(&slot, None);
                Some(next)
            }
            Err(abort) => {
                record(&slot, Some(abort));
                None
            }
        }
    };

    let outcome = store.transaction(code, &DocPath::root(), &body).await?;
    if outcome.committed {
        info!("transaction committed");
        return Ok(CommandOutcome::Applied);
    }
    let abort = slot
        .into_inner()
        .map_err(|e| DomainError::Infrastructure(format!("abort slot poisoned: {e}")))?;
    match abort {
        Some(Abort::Failed(err)) => Err(err),
        Some(Abort::Ignored(reason)) => {
            debug!(%reason, "command ignored");
            Ok(CommandOutcome::Ignored(reason))
        }
        None => Ok(CommandOutcome::Ignored(IgnoredReason::SessionMissing)),
    }
}

/// Reads and decodes the session once.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the read or decoding fails.
pub(crate) async fn load_session(store: &dyn DocumentStore, code: &str) -> Result<Option<Session>, DomainError> {
    store
        .get(code)
        .await?
        .map(Session::from_value)
        .transpose()
        .map_err(DomainError::from)
}

/// Sends direct writes planned against a fresh read.
async fn write_fields<F>(
    store: &dyn DocumentStore,
    code: &str,
    plan: F,
) -> Result<CommandOutcome, DomainError>
where
    F: FnOnce(&Session) -> Result<Vec<FieldWrite>, Abort>,
{
    let Some(session) = load_session(store, code).await? else {
        debug!("session missing");
        return Ok(CommandOutcome::Ignored(IgnoredReason::SessionMissing));
    };
    match plan(&session) {
        Ok(writes) => {
            store.update(code, &writes).await?;
            info!(writes = writes.len(), "fields written");
            Ok(CommandOutcome::Applied)
        }
        Err(Abort::Ignored(reason)) => {
            debug!(%reason, "command ignored");
            Ok(CommandOutcome::Ignored(reason))
        }
        Err(Abort::Failed(err)) => Err(err),
    }
}

fn lock_rng<'a>(
    rng: &'a Mutex<dyn DeterministicRng + Send + 'a>,
) -> Result<std::sync::MutexGuard<'a, dyn DeterministicRng + Send + 'a>, DomainError> {
    rng.lock()
        .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))
}

/// Handles the `CreateSession` command: draws a free join code and commits
/// a new lobby with the caller as host. Returns the code.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a bad identity or name, or
/// `DomainError::Infrastructure` if no free code was found or the store
/// fails.
#[instrument(
    skip(command, rng, store),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id)
)]
pub async fn handle_create_session(
    command: &CreateSession,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn DocumentStore,
) -> Result<String, DomainError> {
    let name = validate_member(&command.player_id, &command.name)?;

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        // Lock RNG only for the draw, never across an await.
        let code = generate_code(&mut *lock_rng(rng)?);
        let value = new_session(&code, &command.player_id, &name).to_value()?;
        let body = |current: Option<&Value>| current.is_none().then(|| value.clone());

        let outcome = store.transaction(&code, &DocPath::root(), &body).await?;
        if outcome.committed {
            info!(%code, attempt, "session created");
            return Ok(code);
        }
        debug!(%code, attempt, "code taken");
    }
    Err(DomainError::Infrastructure(format!(
        "no free session code after {MAX_CODE_ATTEMPTS} attempts"
    )))
}

/// Handles the `JoinSession` command. A player who already belongs to the
/// session is reported as `Ignored(AlreadyJoined)` and keeps their record.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` for an unknown code,
/// `DomainError::GameInProgress` if the game has started without the
/// caller, or `DomainError::Validation` for a bad identity or name.
#[instrument(
    skip(command, store),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_join_session(
    command: &JoinSession,
    store: &dyn DocumentStore,
) -> Result<CommandOutcome, DomainError> {
    let code = normalize_code(&command.code);
    let name = validate_member(&command.player_id, &command.name)?;
    if store.get(&code).await?.is_none() {
        return Err(DomainError::SessionNotFound(code));
    }

    let outcome = transact_session(store, &code, |session| {
        match plan_join(session, &command.player_id, &name)? {
            JoinPlan::Add(next) => Ok(next),
            JoinPlan::Rejoin => Err(IgnoredReason::AlreadyJoined.into()),
        }
    })
    .await?;
    match outcome {
        CommandOutcome::Ignored(IgnoredReason::SessionMissing) => Err(DomainError::SessionNotFound(code)),
        other => Ok(other),
    }
}

/// Handles the `LeaveSession` command. The last player out deletes the
/// session.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, store),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_leave_session(
    command: &LeaveSession,
    store: &dyn DocumentStore,
) -> Result<CommandOutcome, DomainError> {
    transact_session(store, &command.code, |session| {
        Ok(plan_leave(session, &command.player_id)?)
    })
    .await
}

/// Handles the `ToggleReady` command.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, store),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_toggle_ready(
    command: &ToggleReady,
    store: &dyn DocumentStore,
) -> Result<CommandOutcome, DomainError> {
    write_fields(store, &command.code, |session| {
        Ok(toggle_ready_writes(session, &command.player_id)?)
    })
    .await
}

/// Handles the `StartGame` command: deals roles, words, and cards and opens
/// the first discussion.
///
/// The RNG is locked inside the transaction body, which is synchronous.
///
/// # Errors
///
/// Returns `DomainError` if the store fails or the RNG mutex is poisoned.
#[instrument(
    skip(command, clock, rng, store, config),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_start_game(
    command: &StartGame,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn DocumentStore,
    config: &GameConfig,
) -> Result<CommandOutcome, DomainError> {
    let now = clock.now_millis();
    transact_session(store, &command.code, |session| {
        let mut guard = lock_rng(rng)?;
        Ok(plan_start_game(
            session,
            &command.player_id,
            now,
            config,
            &mut *guard,
        )?)
    })
    .await
}

/// Handles the `UseAbility` command. The play is resolved against the
/// freshest session, so a target who has left is rejected.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, clock, store),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_use_ability(
    command: &UseAbility,
    clock: &dyn Clock,
    store: &dyn DocumentStore,
) -> Result<CommandOutcome, DomainError> {
    let now = clock.now_millis();
    let message_key = push_key(now);
    transact_session(store, &command.code, |session| {
        let resolution = resolve_ability(session, &command.player_id, &command.target_id, now)
            .map_err(IgnoredReason::from)?;
        let mut next = session.clone();
        apply_resolution(&mut next, &resolution, &message_key);
        Ok(next)
    })
    .await
}

/// Handles the `ToggleSkipDiscussion` command.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, store),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_toggle_skip_discussion(
    command: &ToggleSkipDiscussion,
    store: &dyn DocumentStore,
) -> Result<CommandOutcome, DomainError> {
    transact_session(store, &command.code, |session| {
        Ok(plan_toggle_skip(session, &command.player_id)?)
    })
    .await
}

/// Handles the `CastVote` command.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, store),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_cast_vote(
    command: &CastVote,
    store: &dyn DocumentStore,
) -> Result<CommandOutcome, DomainError> {
    write_fields(store, &command.code, |session| {
        Ok(vote_writes(session, &command.player_id, &command.target_id)?)
    })
    .await
}

/// Handles the `ForceVoting` command.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, clock, store, config),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_force_voting(
    command: &ForceVoting,
    clock: &dyn Clock,
    store: &dyn DocumentStore,
    config: &GameConfig,
) -> Result<CommandOutcome, DomainError> {
    let now = clock.now_millis();
    transact_session(store, &command.code, |session| {
        Ok(plan_force_voting(session, &command.player_id, now, config)?)
    })
    .await
}

/// Handles the `BeginSuspense` command.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, clock, store, config),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_begin_suspense(
    command: &BeginSuspense,
    clock: &dyn Clock,
    store: &dyn DocumentStore,
    config: &GameConfig,
) -> Result<CommandOutcome, DomainError> {
    let now = clock.now_millis();
    transact_session(store, &command.code, |session| {
        Ok(plan_begin_suspense(session, &command.player_id, now, config)?)
    })
    .await
}

/// Handles the `ResolveVotes` command.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, clock, store, config),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_resolve_votes(
    command: &ResolveVotes,
    clock: &dyn Clock,
    store: &dyn DocumentStore,
    config: &GameConfig,
) -> Result<CommandOutcome, DomainError> {
    let now = clock.now_millis();
    transact_session(store, &command.code, |session| {
        Ok(plan_resolve_votes(session, &command.player_id, now, config)?)
    })
    .await
}

/// Handles the `StartNextRound` command.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, clock, store, config),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_start_next_round(
    command: &StartNextRound,
    clock: &dyn Clock,
    store: &dyn DocumentStore,
    config: &GameConfig,
) -> Result<CommandOutcome, DomainError> {
    let now = clock.now_millis();
    transact_session(store, &command.code, |session| {
        Ok(plan_next_round(session, &command.player_id, now, config)?)
    })
    .await
}

/// Handles the `ReturnToLobby` command.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
#[instrument(
    skip(command, store),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id, code = %command.code)
)]
pub async fn handle_return_to_lobby(
    command: &ReturnToLobby,
    store: &dyn DocumentStore,
) -> Result<CommandOutcome, DomainError> {
    transact_session(store, &command.code, |session| {
        Ok(plan_return_to_lobby(session, &command.player_id)?)
    })
    .await
}
