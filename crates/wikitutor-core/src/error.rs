//! Error types for Wikitutor

use thiserror::Error;

/// Result type alias using Wikitutor's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Wikitutor error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Resolution errors (E001-E099)
    #[error("Topic '{0}' not found. Try a different spelling or a more specific title.")]
    TopicNotFound(String),

    #[error("Invalid summary level '{0}'. Valid levels: basic, intermediate, advanced.")]
    InvalidLevel(String),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check your API key with `wikitutor config get llm.api_key`.")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    #[error("Knowledge source error: {0}")]
    KnowledgeSourceError(String),

    // Generation errors (E200-E299)
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("No suitable model found: {0}")]
    NoSuitableModel(String),

    // Timeout errors (E300-E399)
    #[error("Timed out after {1} ms waiting for {0}")]
    Timeout(String, u64),

    // Storage errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::TopicNotFound(_) => "E001",
            Self::InvalidLevel(_) => "E002",
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::KnowledgeSourceError(_) => "E103",
            Self::GenerationFailed(_) => "E200",
            Self::NoSuitableModel(_) => "E201",
            Self::Timeout(..) => "E300",
            Self::DatabaseError(_) => "E400",
            Self::CacheError(_) => "E401",
            Self::Serialization(_) => "E402",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::TopicNotFound(topic) => Some(format!("wikitutor resolve \"{}\"", topic)),
            Self::InvalidLevel(_) => Some("--level basic|intermediate|advanced".to_string()),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("wikitutor config get llm.api_key".to_string()),
            Self::GenerationFailed(_) => Some("Retry the request; generation output can vary".to_string()),
            Self::ConfigError(_) => Some("wikitutor config list".to_string()),
            _ => None,
        }
    }

    /// Whether this error came from an unreachable or misbehaving collaborator
    /// rather than from the caller's input.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_) | Self::RateLimited(_) | Self::Timeout(..) | Self::CacheError(_)
        )
    }
}
