//! In-process implementation of the shared document store.
//!
//! Stands in for a networked real-time database: many tasks subscribe to the
//! same document, write fields, and race transactions against each other.

pub mod memory_document_store;

pub use memory_document_store::MemoryDocumentStore;
