//! Wikitutor Core Library
//!
//! Turns a free-form topic into encyclopedia-backed study material:
//! - Canonical topic resolution against the encyclopedia
//! - Article intros and related links
//! - Summaries at three reading levels
//! - Ranked, deduplicated learning paths
//!
//! Every artifact is served from an in-process cache, then from SQLite, and
//! only generated when both miss.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod generation;
pub mod infrastructure;
pub mod knowledge;
pub mod llm;
pub mod retrieval;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{ApiResponse, Status, TopicApi, Wikitutor};
    pub use crate::config::Config;
    pub use crate::domain::topic::SummaryLevel;
    pub use crate::error::{Error, Result};
}
