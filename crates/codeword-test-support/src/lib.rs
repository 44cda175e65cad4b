//! Shared test doubles for the Codeword session engine.

mod clock;
mod rng;
mod store;

pub use clock::{FixedClock, ManualClock};
pub use rng::{MockRng, SequenceRng};
pub use store::{FailingDocumentStore, RecordingDocumentStore};
