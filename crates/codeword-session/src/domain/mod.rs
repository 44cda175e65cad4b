//! Domain layer: commands, lifecycle and phase plans, write builders.

pub mod commands;
pub mod lifecycle;
pub mod outcome;
pub mod phase;
pub mod writes;
