//! Retrieval
//!
//! The cache → store → generate cascade, canonicalization, learning-path
//! deduplication and the per-key in-flight guard.

mod artifacts;
mod cascade;
mod dedup;
mod orchestrator;
mod resolver;
mod single_flight;

pub use cascade::CallBounds;
pub use dedup::dedup;
pub use orchestrator::{Collaborators, RetrievalOrchestrator};
pub use resolver::{CanonicalResolver, Canonicalizer};
pub use single_flight::{FlightGuard, KeyedLocks};
