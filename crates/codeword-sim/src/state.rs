//! Shared simulation state.

use std::sync::{Arc, Mutex};

use codeword_core::clock::Clock;
use codeword_core::rng::DeterministicRng;
use codeword_core::store::DocumentStore;
use codeword_session::config::GameConfig;

/// Everything a bot needs to reach the shared session.
#[derive(Clone)]
pub struct SimState {
    /// Clock for deadlines.
    pub clock: Arc<dyn Clock>,
    /// RNG for code generation and the deal.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// The shared document store.
    pub store: Arc<dyn DocumentStore>,
    /// Rules shared by every client.
    pub config: GameConfig,
}

impl SimState {
    /// Create new simulation state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        store: Arc<dyn DocumentStore>,
        config: GameConfig,
    ) -> Self {
        Self {
            clock,
            rng,
            store,
            config,
        }
    }
}
