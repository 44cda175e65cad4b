//! Simulation configuration.
//!
//! Read from the environment on top of [`GameConfig`]:
//!
//! | Variable | Default |
//! |---|---|
//! | `SIM_PLAYERS` | 5 |
//! | `SIM_SEED` | unset (entropy) |
//! | `SIM_SKIP_DISCUSSION` | true |
//! | `SIM_TIMEOUT_SECS` | 120 |

use std::str::FromStr;
use std::time::Duration;

use codeword_session::config::GameConfig;

use crate::error::SimError;

/// Largest table the role deal supports.
pub const MAX_PLAYERS: usize = 9;

/// How a simulated game is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Number of bots at the table.
    pub players: usize,
    /// Seed for the deal and the bots' choices; entropy if unset.
    pub seed: Option<u64>,
    /// Whether bots ask to end discussion early instead of waiting for
    /// the timer.
    pub skip_discussion: bool,
    /// Upper bound on the whole game.
    pub timeout: Duration,
    /// Rules shared by every bot.
    pub game: GameConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            players: 5,
            seed: None,
            skip_discussion: true,
            timeout: Duration::from_secs(120),
            game: GameConfig::default(),
        }
    }
}

impl SimConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if a variable does not parse or is out of
    /// range.
    pub fn from_env() -> Result<Self, SimError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if a value does not parse or is out of
    /// range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SimError> {
        let game = GameConfig::from_lookup(&lookup).map_err(|e| SimError::Config(e.to_string()))?;
        let defaults = Self::default();
        let seed = lookup("SIM_SEED")
            .map(|raw| parse::<u64>("SIM_SEED", &raw))
            .transpose()?;
        let config = Self {
            players: lookup("SIM_PLAYERS")
                .map_or(Ok(defaults.players), |raw| parse("SIM_PLAYERS", &raw))?,
            seed,
            skip_discussion: lookup("SIM_SKIP_DISCUSSION")
                .map_or(Ok(defaults.skip_discussion), |raw| {
                    parse("SIM_SKIP_DISCUSSION", &raw)
                })?,
            timeout: lookup("SIM_TIMEOUT_SECS")
                .map_or(Ok(defaults.timeout), |raw| {
                    parse("SIM_TIMEOUT_SECS", &raw).map(Duration::from_secs)
                })?,
            game,
        };
        if config.players < config.game.min_players || config.players > MAX_PLAYERS {
            return Err(SimError::Config(format!(
                "SIM_PLAYERS must be between {} and {MAX_PLAYERS}, got {}",
                config.game.min_players, config.players
            )));
        }
        Ok(config)
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, SimError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| SimError::Config(format!("{key}: {e}")))
}
