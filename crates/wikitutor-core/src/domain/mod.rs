//! Domain layer
//!
//! Topic artifacts, summary levels and the persistent store contract.

pub mod topic;
