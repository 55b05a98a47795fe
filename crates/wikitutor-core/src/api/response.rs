//! Status-coded responses and their payloads

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

/// Outcome class of a boundary call, using HTTP status semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    InternalError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalError => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Response of one boundary call
///
/// Failures carry `{"error": message}` as their body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: Status,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self {
                status: Status::Ok,
                body,
            },
            Err(e) => {
                error!(error = %e, "Failed to serialize response payload");
                Self::error(Status::InternalError, "Failed to serialize response")
            }
        }
    }

    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(Status::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(Status::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::error(Status::InternalError, message)
    }

    /// Error message of a failed response
    pub fn error_message(&self) -> Option<&str> {
        if self.status.is_success() {
            return None;
        }
        self.body.get("error").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvePayload {
    pub input: String,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePayload {
    pub topic: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinksPayload {
    pub topic: String,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub topic: String,
    pub level: String,
    pub summary: String,
}

/// `summary` is `null` when the path exists but no summary could be made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPathPayload {
    pub topic: String,
    pub level: String,
    pub summary: Option<String>,
    pub links: Vec<String>,
}

/// Regenerated path with the basic-level summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerankPayload {
    pub topic: String,
    pub summary: Option<String>,
    pub links: Vec<String>,
}
