//! Session and player data model.
//!
//! These types mirror the shared JSON document one-to-one (camelCase wire
//! names). Every client deserializes the same snapshot into a [`Session`]
//! and derives everything else from it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable client-generated player identity.
pub type PlayerId = String;

/// Hidden role dealt at game start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Majority player holding the majority word.
    Local,
    /// The impostor holding the impostor word.
    Spy,
    /// Holds no word; wins with the locals.
    Tourist,
    /// Wants to be ejected.
    Joker,
}

impl Role {
    /// Whether a RADAR scan reads this role as a threat.
    #[must_use]
    pub fn is_threat(self) -> bool {
        matches!(self, Self::Spy | Self::Tourist | Self::Joker)
    }

    /// The faction whose win this role shares.
    #[must_use]
    pub fn faction(self) -> Faction {
        match self {
            Self::Local | Self::Tourist => Faction::Locals,
            Self::Spy => Faction::Spy,
            Self::Joker => Faction::Joker,
        }
    }
}

/// A winning side. Also the type of `Session::winner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Faction {
    /// Locals and tourists.
    Locals,
    /// The spy alone.
    Spy,
    /// The joker alone.
    Joker,
}

/// One-shot ability card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbilityCard {
    /// Publicly reveals whether the target reads as SAFE or THREAT.
    Radar,
    /// Silently nullifies the target's votes for the rest of the game.
    Silencer,
    /// Silently inverts the next RADAR scan of the target.
    Spoof,
}

/// Session phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Waiting for players to ready up.
    #[default]
    Lobby,
    /// Discussion timer running.
    Discussion,
    /// Locked, hidden voting.
    Voting,
    /// Fixed-length pause before results.
    Suspense,
    /// Round outcome shown.
    Results,
}

impl Phase {
    /// Whether the state machine has an edge from `self` to `next`.
    ///
    /// Every phase may reset to the lobby except the lobby itself.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Lobby, Self::Discussion)
                | (Self::Discussion, Self::Voting)
                | (Self::Voting, Self::Suspense)
                | (Self::Suspense, Self::Results)
                | (Self::Results, Self::Discussion)
                | (
                    Self::Discussion | Self::Voting | Self::Suspense | Self::Results,
                    Self::Lobby
                )
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lobby => "LOBBY",
            Self::Discussion => "DISCUSSION",
            Self::Voting => "VOTING",
            Self::Suspense => "SUSPENSE",
            Self::Results => "RESULTS",
        };
        f.write_str(name)
    }
}

/// Whether a prompt pair is a noun or a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    /// A single word.
    Word,
    /// A question to answer aloud.
    Question,
}

/// Pending-scramble trap planted by SPOOF.
///
/// Serialized as the `isScrambled` boolean. The only way to clear an armed
/// trap mid-game is [`ScrambleTrap::consume`], which the RADAR scan calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum ScrambleTrap {
    /// No trap planted.
    #[default]
    Clear,
    /// The next RADAR scan of this player is inverted.
    Armed,
}

impl ScrambleTrap {
    /// Plants the trap. Planting twice is the same as once.
    pub fn arm(&mut self) {
        *self = Self::Armed;
    }

    /// Clears the trap and reports whether it was armed.
    pub fn consume(&mut self) -> bool {
        std::mem::take(self) == Self::Armed
    }

    /// Whether the trap is armed.
    #[must_use]
    pub fn is_armed(self) -> bool {
        self == Self::Armed
    }
}

impl From<bool> for ScrambleTrap {
    fn from(armed: bool) -> Self {
        if armed { Self::Armed } else { Self::Clear }
    }
}

impl From<ScrambleTrap> for bool {
    fn from(trap: ScrambleTrap) -> Self {
        trap.is_armed()
    }
}

/// One participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Player {
    /// Stable identity.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Whether this player created the session.
    pub is_host: bool,
    /// Lobby readiness.
    pub is_ready: bool,
    /// Dealt role, unset in the lobby.
    pub role: Option<Role>,
    /// Dealt word; empty for the tourist.
    pub secret_word: String,
    /// Dealt card, if any.
    pub ability_card: Option<AbilityCard>,
    /// Whether the card has been played this game.
    pub is_card_used: bool,
    /// Who the card was played on.
    pub card_target_id: Option<PlayerId>,
    /// Current vote.
    pub voted_for: Option<PlayerId>,
    /// Whether the vote is final for this round.
    pub is_vote_locked: bool,
    /// Whether this player's votes are excluded from tallies.
    pub is_silenced: bool,
    /// SPOOF trap.
    #[serde(rename = "isScrambled")]
    pub scramble: ScrambleTrap,
    /// Ejected in round 1.
    pub is_eliminated: bool,
}

impl Player {
    /// A fresh lobby player.
    #[must_use]
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, is_host: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_host,
            ..Self::default()
        }
    }

    /// Not eliminated.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_eliminated
    }

    /// Whether this player's vote is counted by the tally.
    #[must_use]
    pub fn has_counting_vote(&self) -> bool {
        self.is_active() && !self.is_silenced && self.voted_for.is_some()
    }
}

/// Kind tag of a broadcast message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemMessageKind {
    /// Outcome of a RADAR scan.
    RadarResult,
}

/// Public, round-persistent broadcast entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: SystemMessageKind,
    /// Human-readable text.
    pub text: String,
    /// Player the message is about.
    pub target_id: PlayerId,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// One game session; the whole shared document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    /// Join code.
    pub code: String,
    /// Identity of the host.
    pub host_id: PlayerId,
    /// Players keyed by identity.
    pub players: BTreeMap<PlayerId, Player>,
    /// Current phase.
    pub phase: Phase,
    /// 1 or 2.
    #[serde(default = "first_round")]
    pub round: u8,
    /// Discussion deadline, epoch milliseconds.
    pub timer_end_time: Option<i64>,
    /// Suspense deadline, epoch milliseconds.
    pub suspense_end_time: Option<i64>,
    /// Prompt shown to everyone but the spy.
    pub majority_word: String,
    /// Prompt shown to the spy.
    pub impostor_word: String,
    /// Kind of the current prompt pair.
    pub word_kind: Option<PromptKind>,
    /// Catalog indices already drawn in this session.
    pub used_prompt_indices: Vec<usize>,
    /// Players asking to end discussion early.
    pub votes_to_skip_discussion: BTreeSet<PlayerId>,
    /// Terminal outcome.
    pub winner: Option<Faction>,
    /// Broadcast log keyed by a push key that sorts by time.
    pub system_messages: BTreeMap<String, SystemMessage>,
}

fn first_round() -> u8 {
    1
}

impl Session {
    /// A new lobby with `host` as its only player.
    #[must_use]
    pub fn new(code: impl Into<String>, host: Player) -> Self {
        let mut players = BTreeMap::new();
        let host_id = host.id.clone();
        players.insert(host_id.clone(), host);
        Self {
            code: code.into(),
            host_id,
            players,
            phase: Phase::Lobby,
            round: 1,
            ..Self::default()
        }
    }

    /// Decodes a document snapshot.
    ///
    /// Player records whose `id` does not match their key are dropped. A
    /// late field write for someone who already left leaves such a record
    /// behind, and it must not count as a player.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document does not match the model.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut session: Self = serde_json::from_value(value)?;
        session.players.retain(|key, player| *key == player.id);
        Ok(session)
    }

    /// Encodes this session as a document.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if encoding fails.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Looks up a player.
    #[must_use]
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    /// Players that are not eliminated.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_active())
    }

    /// Number of players that are not eliminated.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_players().count()
    }

    /// Whether every active player has locked a vote.
    #[must_use]
    pub fn all_active_votes_locked(&self) -> bool {
        let mut active = self.active_players().peekable();
        active.peek().is_some() && active.all(|p| p.is_vote_locked)
    }

    /// The player currently responsible for host duties: `host_id` while
    /// that player is present, otherwise the smallest remaining identity.
    #[must_use]
    pub fn effective_host(&self) -> Option<&PlayerId> {
        if self.players.contains_key(&self.host_id) {
            Some(&self.host_id)
        } else {
            self.players.keys().next()
        }
    }

    /// Whether `id` is the effective host.
    #[must_use]
    pub fn is_effective_host(&self, id: &str) -> bool {
        self.effective_host().is_some_and(|host| host == id)
    }

    /// Broadcast messages in time order.
    pub fn system_log(&self) -> impl Iterator<Item = &SystemMessage> {
        self.system_messages.values()
    }
}
