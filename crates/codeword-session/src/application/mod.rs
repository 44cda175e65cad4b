//! Application layer: handlers against the document store.

pub mod command_handlers;
pub mod host_duties;
pub mod query_handlers;
