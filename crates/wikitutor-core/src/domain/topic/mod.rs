//! Topic domain module
//!
//! Types for canonical topics and their derived artifacts, plus the
//! repository trait implemented by the persistent store.

mod entity;
mod repository;

pub use entity::{
    Article, ArtifactKind, CanonicalMapping, LearningPath, LinkSet, Summaries, SummaryLevel,
    SummarySet, normalize_input,
};
pub use repository::{TopicStore, TopicStoreStats};
