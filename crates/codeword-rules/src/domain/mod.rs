//! Domain model and rules.

pub mod abilities;
pub mod catalog;
pub mod distribution;
pub mod model;
pub mod tally;
