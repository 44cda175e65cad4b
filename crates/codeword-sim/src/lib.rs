//! Codeword simulation — bots playing a whole game.
//!
//! Each bot runs as its own task against one shared document store,
//! reacting to snapshots exactly the way a real client would. The driver
//! seats the table, lets the bots play, and reports the result.

pub mod bot;
pub mod config;
pub mod error;
pub mod state;

use codeword_core::error::DomainError;
use codeword_core::rng::StdRandom;
use codeword_rules::domain::model::{Faction, PlayerId, Role, Session};
use codeword_session::application::command_handlers::{handle_create_session, handle_join_session};
use codeword_session::domain::commands::{CreateSession, JoinSession};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::bot::run_bot;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::state::SimState;

/// One seat at the finished table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatReport {
    /// Player identity.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Dealt role.
    pub role: Option<Role>,
    /// Ejected in round 1.
    pub eliminated: bool,
}

/// Result of a simulated game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimReport {
    /// Session code.
    pub code: String,
    /// Winning faction.
    pub winner: Faction,
    /// Round the game ended in.
    pub rounds: u8,
    /// Every seat.
    pub seats: Vec<SeatReport>,
    /// Public broadcasts in time order.
    pub system_log: Vec<String>,
}

fn bot_rng(seed: Option<u64>, seat: usize) -> StdRandom {
    seed.map_or_else(StdRandom::from_entropy, |seed| {
        StdRandom::seeded(seed.wrapping_add(seat as u64 + 1))
    })
}

/// Seats `config.players` bots, plays one game, and reports it.
///
/// # Errors
///
/// Returns `SimError::Timeout` if the game outlasts `config.timeout`, or
/// the first error any bot or handler hit.
#[instrument(skip_all, fields(players = config.players, seed = ?config.seed))]
pub async fn run_simulation(state: &SimState, config: &SimConfig) -> Result<SimReport, SimError> {
    let seats: Vec<(PlayerId, String)> = (1..=config.players)
        .map(|n| (Uuid::new_v4().simple().to_string(), format!("Bot {n}")))
        .collect();
    let Some((host_id, host_name)) = seats.first() else {
        return Err(SimError::Config("no players to seat".to_owned()));
    };

    let code = handle_create_session(
        &CreateSession {
            correlation_id: Uuid::new_v4(),
            player_id: host_id.clone(),
            name: host_name.clone(),
        },
        state.rng.as_ref(),
        state.store.as_ref(),
    )
    .await?;
    for (player_id, name) in seats.iter().skip(1) {
        let command = JoinSession {
            correlation_id: Uuid::new_v4(),
            code: code.clone(),
            player_id: player_id.clone(),
            name: name.clone(),
        };
        handle_join_session(&command, state.store.as_ref()).await?;
    }
    info!(%code, "table seated");

    let mut bots = JoinSet::new();
    for (seat, (player_id, _)) in seats.iter().enumerate() {
        bots.spawn(run_bot(
            state.clone(),
            code.clone(),
            player_id.clone(),
            config.skip_discussion,
            bot_rng(config.seed, seat),
        ));
    }
    let finished = tokio::time::timeout(config.timeout, async {
        while let Some(joined) = bots.join_next().await {
            joined??;
        }
        Ok::<(), SimError>(())
    })
    .await;
    match finished {
        Ok(result) => result?,
        Err(_) => return Err(SimError::Timeout(config.timeout)),
    }

    let Some(value) = state.store.get(&code).await? else {
        return Err(SimError::SessionVanished(code));
    };
    let session = Session::from_value(value).map_err(DomainError::from)?;
    let Some(winner) = session.winner else {
        return Err(SimError::NoWinner(code));
    };
    let report = SimReport {
        code,
        winner,
        rounds: session.round,
        seats: session
            .players
            .values()
            .map(|p| SeatReport {
                player_id: p.id.clone(),
                name: p.name.clone(),
                role: p.role,
                eliminated: p.is_eliminated,
            })
            .collect(),
        system_log: session.system_log().map(|m| m.text.clone()).collect(),
    };
    info!(code = %report.code, winner = ?report.winner, rounds = report.rounds, "game finished");
    Ok(report)
}
