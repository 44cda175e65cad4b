//! Codeword Core — shared abstractions for the session engine.
//!
//! This crate defines the traits and types every other crate depends on:
//! time, randomness, commands, errors, and the shared-document store seam.
//! It contains no game rules and no concrete store.

pub mod clock;
pub mod command;
pub mod error;
pub mod rng;
pub mod store;
