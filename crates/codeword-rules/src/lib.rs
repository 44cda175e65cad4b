//! Codeword — Rules & Resolution bounded context.
//!
//! Pure functions over a session snapshot: prompt catalog, role and
//! ability distribution, ability resolution, vote tally, and win
//! determination. Nothing here performs I/O.

pub mod domain;
