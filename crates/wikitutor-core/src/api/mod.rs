//! Boundary API
//!
//! Maps retrieval results onto status-coded responses: 400 for an invalid
//! level, 404 when a topic cannot be resolved, 500 when an artifact cannot
//! be produced and 200 with a JSON payload otherwise. The command line is
//! a thin client of this module.

mod app;
pub mod health;
mod response;
mod topics;

pub use app::Wikitutor;
pub use health::{HealthCheck, HealthReport, HealthStatus, doctor};
pub use response::{
    ApiResponse, ArticlePayload, LearningPathPayload, LinksPayload, RerankPayload,
    ResolvePayload, Status, SummaryPayload,
};
pub use topics::TopicApi;
