//! Codeword — Session & Synchronization bounded context.
//!
//! Turns client intents into document writes against the shared session,
//! choosing between single-writer direct writes and root transactions, and
//! derives each client's view and host duties from a snapshot.

pub mod application;
pub mod config;
pub mod domain;
