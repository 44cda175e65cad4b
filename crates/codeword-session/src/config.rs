//! Game timing and lobby configuration.
//!
//! Read from the environment at startup:
//!
//! | Variable | Default |
//! |---|---|
//! | `CODEWORD_DISCUSSION_SECS` | 420 |
//! | `CODEWORD_SUSPENSE_MILLIS` | 3000 |
//! | `CODEWORD_HOST_GRACE_MILLIS` | 5000 |
//! | `CODEWORD_MIN_PLAYERS` | 3 |
//! | `CODEWORD_POLL_MILLIS` | 250 |

use std::str::FromStr;
use std::time::Duration;

use codeword_core::error::DomainError;

/// Timing and lobby rules shared by every client of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Length of each discussion window.
    pub discussion_millis: i64,
    /// Pause between the last locked vote and the results.
    pub suspense_millis: i64,
    /// How long past a deadline a non-host client waits before advancing
    /// the phase itself.
    pub host_grace_millis: i64,
    /// Players required to start a game.
    pub min_players: usize,
    /// How often a client re-checks timers when no snapshot arrives.
    pub poll_interval: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            discussion_millis: 420_000,
            suspense_millis: 3_000,
            host_grace_millis: 5_000,
            min_players: 3,
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl GameConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a variable is set but does not
    /// parse, or if the result is out of range.
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for unset keys.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a value does not parse, or if
    /// the result is out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let defaults = Self::default();
        let discussion_secs: i64 =
            parse_or(&lookup, "CODEWORD_DISCUSSION_SECS", defaults.discussion_millis / 1_000)?;
        let config = Self {
            discussion_millis: discussion_secs.saturating_mul(1_000),
            suspense_millis: parse_or(&lookup, "CODEWORD_SUSPENSE_MILLIS", defaults.suspense_millis)?,
            host_grace_millis: parse_or(
                &lookup,
                "CODEWORD_HOST_GRACE_MILLIS",
                defaults.host_grace_millis,
            )?,
            min_players: parse_or(&lookup, "CODEWORD_MIN_PLAYERS", defaults.min_players)?,
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "CODEWORD_POLL_MILLIS",
                250_u64,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.discussion_millis <= 0 {
            return Err(DomainError::Validation(
                "CODEWORD_DISCUSSION_SECS must be positive".to_owned(),
            ));
        }
        if self.suspense_millis < 0 || self.host_grace_millis < 0 {
            return Err(DomainError::Validation(
                "suspense and grace durations must not be negative".to_owned(),
            ));
        }
        if self.min_players < 3 {
            return Err(DomainError::Validation(
                "CODEWORD_MIN_PLAYERS must be at least 3".to_owned(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(DomainError::Validation(
                "CODEWORD_POLL_MILLIS must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| DomainError::Validation(format!("{key} must be a number: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = GameConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, GameConfig::default());
        assert_eq!(config.discussion_millis, 7 * 60 * 1_000);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = GameConfig::from_lookup(lookup(&[
            ("CODEWORD_DISCUSSION_SECS", "30"),
            ("CODEWORD_SUSPENSE_MILLIS", "0"),
            ("CODEWORD_MIN_PLAYERS", " 4 "),
            ("CODEWORD_POLL_MILLIS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.discussion_millis, 30_000);
        assert_eq!(config.suspense_millis, 0);
        assert_eq!(config.min_players, 4);
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_unparseable_value_is_rejected() {
        let result = GameConfig::from_lookup(lookup(&[("CODEWORD_MIN_PLAYERS", "three")]));

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("CODEWORD_MIN_PLAYERS")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_too_few_min_players_is_rejected() {
        let result = GameConfig::from_lookup(lookup(&[("CODEWORD_MIN_PLAYERS", "2")]));

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
