//! Topic artifact types
//!
//! Every derived artifact is keyed by canonical title. Only the canonical
//! mapping is keyed by (normalized) user input.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Normalize raw user input into the key used for canonical-mapping lookups.
pub fn normalize_input(input: &str) -> String {
    input.to_lowercase()
}

/// Reading level of a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLevel {
    /// Young learners, grades 1-3
    #[default]
    Basic,
    /// High school, grades 7-12
    Intermediate,
    /// Master's degree level
    Advanced,
}

impl SummaryLevel {
    /// All levels, in increasing complexity
    pub const ALL: [SummaryLevel; 3] = [Self::Basic, Self::Intermediate, Self::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Number of related links suited to this level (6/8/10).
    ///
    /// Learning paths do not use this: they are always ranked to the
    /// configured length regardless of level.
    pub fn link_budget(&self) -> usize {
        match self {
            Self::Basic => 6,
            Self::Intermediate => 8,
            Self::Advanced => 10,
        }
    }

    /// Take the leading links that fit this level's budget.
    pub fn slice_links<'a>(&self, links: &'a [String]) -> &'a [String] {
        &links[..links.len().min(self.link_budget())]
    }
}

impl fmt::Display for SummaryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}

/// Kind of artifact handled by the retrieval cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// User input -> canonical title
    Canonical,
    Article,
    Links,
    Summary,
    LearningPath,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::Article => "article",
            Self::Links => "links",
            Self::Summary => "summary",
            Self::LearningPath => "learning_path",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored mapping from user input to canonical title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMapping {
    pub user_input: String,
    pub canonical_title: String,
}

/// Introductory article text for a canonical topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub topic: String,
    pub full_text: String,
    pub retrieved_at: DateTime<Utc>,
}

/// Related topic titles for a canonical topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSet {
    pub topic: String,
    pub links: Vec<String>,
}

/// The three leveled summaries produced by one generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summaries {
    pub basic: String,
    pub intermediate: String,
    pub advanced: String,
}

impl Summaries {
    pub fn new(
        basic: impl Into<String>,
        intermediate: impl Into<String>,
        advanced: impl Into<String>,
    ) -> Self {
        Self {
            basic: basic.into(),
            intermediate: intermediate.into(),
            advanced: advanced.into(),
        }
    }

    pub fn get(&self, level: SummaryLevel) -> &str {
        match level {
            SummaryLevel::Basic => &self.basic,
            SummaryLevel::Intermediate => &self.intermediate,
            SummaryLevel::Advanced => &self.advanced,
        }
    }

    /// Iterate `(level, text)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (SummaryLevel, &str)> {
        SummaryLevel::ALL.into_iter().map(move |level| (level, self.get(level)))
    }
}

/// Persisted summary set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySet {
    pub topic: String,
    pub summaries: Summaries,
    pub generated_at: DateTime<Utc>,
}

/// Ranked learning path for a canonical topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub topic: String,
    pub links: Vec<String>,
    pub last_updated: DateTime<Utc>,
}
