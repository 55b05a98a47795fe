//! Topic store infrastructure
//!
//! SQLite-backed implementation of the [`TopicStore`](crate::domain::topic::TopicStore) trait.

mod repository;

pub use repository::SqliteTopicStore;
