//! Role, word, and ability-card distribution.
//!
//! Roles scale with player count: one spy always, a tourist from four
//! players, a joker from five. SPOOF always lands on a threat so a fake
//! scan result can never be planted by a local; RADAR and SILENCER are
//! dealt without regard to role.

use std::collections::BTreeMap;

use codeword_core::rng::{DeterministicRng, pick_index, shuffle};

use super::catalog::pick_unused;
use super::model::{AbilityCard, PlayerId, PromptKind, Role};

/// Player count at which a tourist is dealt.
pub const TOURIST_MIN_PLAYERS: usize = 4;

/// Player count at which a joker is dealt.
pub const JOKER_MIN_PLAYERS: usize = 5;

/// Standard cards dealt after SPOOF, in priority order.
const STANDARD_CARDS: [AbilityCard; 3] =
    [AbilityCard::Radar, AbilityCard::Radar, AbilityCard::Silencer];

/// A dealt role and the word that goes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Dealt role.
    pub role: Role,
    /// Word shown to the player; empty for the tourist.
    pub secret_word: String,
}

/// Everything dealt at game start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Role and word per player.
    pub assignments: BTreeMap<PlayerId, RoleAssignment>,
    /// Card per player; `None` for players without one.
    pub cards: BTreeMap<PlayerId, Option<AbilityCard>>,
    /// Majority prompt.
    pub majority_word: String,
    /// Spy prompt.
    pub impostor_word: String,
    /// Prompt kind.
    pub kind: PromptKind,
    /// Catalog index of the prompt pair.
    pub prompt_index: usize,
}

impl Distribution {
    /// Players dealt `role`.
    pub fn holders_of(&self, role: Role) -> impl Iterator<Item = &PlayerId> {
        self.assignments
            .iter()
            .filter(move |(_, assignment)| assignment.role == role)
            .map(|(id, _)| id)
    }

    /// Players dealt `card`.
    pub fn card_holders(&self, card: AbilityCard) -> impl Iterator<Item = &PlayerId> {
        self.cards
            .iter()
            .filter(move |(_, dealt)| **dealt == Some(card))
            .map(|(id, _)| id)
    }
}

/// Deals roles, words, and cards to `player_ids`.
///
/// Identities are sorted before shuffling so that a seeded RNG produces the
/// same deal regardless of the order the caller collected them in. The
/// lobby gate guarantees at least three players; smaller inputs still
/// produce a consistent (if degenerate) deal.
pub fn distribute(
    player_ids: &[PlayerId],
    used_prompt_indices: &[usize],
    rng: &mut dyn DeterministicRng,
) -> Distribution {
    let (prompt, prompt_index) = pick_unused(used_prompt_indices, rng);

    let mut sorted: Vec<PlayerId> = player_ids.to_vec();
    sorted.sort();
    sorted.dedup();
    let count = sorted.len();

    let mut deck = sorted.clone();
    shuffle(&mut deck, rng);

    let mut assignments = BTreeMap::new();
    let mut deal = |deck: &mut Vec<PlayerId>, role: Role, word: &str| {
        if let Some(id) = deck.pop() {
            assignments.insert(
                id,
                RoleAssignment {
                    role,
                    secret_word: word.to_owned(),
                },
            );
        }
    };

    deal(&mut deck, Role::Spy, prompt.impostor);
    if count >= TOURIST_MIN_PLAYERS {
        deal(&mut deck, Role::Tourist, "");
    }
    if count >= JOKER_MIN_PLAYERS {
        deal(&mut deck, Role::Joker, prompt.majority);
    }
    while !deck.is_empty() {
        deal(&mut deck, Role::Local, prompt.majority);
    }

    let cards = deal_cards(&sorted, &assignments, rng);

    Distribution {
        assignments,
        cards,
        majority_word: prompt.majority.to_owned(),
        impostor_word: prompt.impostor.to_owned(),
        kind: prompt.kind,
        prompt_index,
    }
}

fn deal_cards(
    sorted_ids: &[PlayerId],
    assignments: &BTreeMap<PlayerId, RoleAssignment>,
    rng: &mut dyn DeterministicRng,
) -> BTreeMap<PlayerId, Option<AbilityCard>> {
    let mut cards: BTreeMap<PlayerId, Option<AbilityCard>> =
        sorted_ids.iter().map(|id| (id.clone(), None)).collect();

    let threats: Vec<&PlayerId> = sorted_ids
        .iter()
        .filter(|id| assignments.get(*id).is_some_and(|a| a.role.is_threat()))
        .collect();

    let mut pool: Vec<PlayerId> = sorted_ids.to_vec();
    if !threats.is_empty() {
        let spoofer = threats[pick_index(threats.len(), rng)].clone();
        pool.retain(|id| *id != spoofer);
        cards.insert(spoofer, Some(AbilityCard::Spoof));
    }

    shuffle(&mut pool, rng);
    for card in STANDARD_CARDS {
        let Some(id) = pool.pop() else {
            break;
        };
        cards.insert(id, Some(card));
    }

    cards
}
