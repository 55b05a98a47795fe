//! Cache key builders
//!
//! Derived artifacts are keyed by canonical title. Canonical mappings are
//! keyed by normalized user input.

use crate::domain::topic::{SummaryLevel, normalize_input};

pub fn canonical(user_input: &str) -> String {
    format!("canonical:{}", normalize_input(user_input))
}

pub fn article(topic: &str) -> String {
    format!("article:{}", topic)
}

pub fn links(topic: &str) -> String {
    format!("links:{}", topic)
}

pub fn summary(topic: &str, level: SummaryLevel) -> String {
    format!("summary:{}:{}", topic, level.as_str())
}

pub fn learning_path(topic: &str) -> String {
    format!("learning_path:{}", topic)
}

/// Every key held for a topic: article, links, the three summary levels,
/// the learning path and the canonical mapping of the topic string itself.
pub fn topic_keys(topic: &str) -> Vec<String> {
    let mut keys = vec![article(topic), links(topic)];
    keys.extend(SummaryLevel::ALL.iter().map(|level| summary(topic, *level)));
    keys.push(learning_path(topic));
    keys.push(canonical(topic));
    keys
}
