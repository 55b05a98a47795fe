//! Infrastructure layer
//!
//! SQLite-backed implementations of the domain repositories.

pub mod topic;
