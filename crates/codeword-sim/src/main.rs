//! Codeword simulation entry point.

use std::error::Error;
use std::sync::{Arc, Mutex};

use codeword_core::clock::SystemClock;
use codeword_core::rng::{DeterministicRng, StdRandom};
use codeword_doc_store::MemoryDocumentStore;
use codeword_sim::config::SimConfig;
use codeword_sim::run_simulation;
use codeword_sim::state::SimState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Codeword simulation");

    // Read configuration from environment.
    let config = SimConfig::from_env()?;

    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(
        config.seed.map_or_else(StdRandom::from_entropy, StdRandom::seeded),
    ));
    let state = SimState::new(
        Arc::new(SystemClock),
        rng,
        Arc::new(MemoryDocumentStore::new()),
        config.game.clone(),
    );

    let report = run_simulation(&state, &config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
