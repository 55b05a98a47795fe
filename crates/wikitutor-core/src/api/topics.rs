//! Topic API
//!
//! One call per retrieval operation. Absence from the orchestrator becomes a
//! 404 when the topic itself cannot be resolved and a 500 when a derived
//! artifact cannot be produced.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::topic::SummaryLevel;
use crate::retrieval::RetrievalOrchestrator;

use super::response::{
    ApiResponse, ArticlePayload, LearningPathPayload, LinksPayload, RerankPayload,
    ResolvePayload, SummaryPayload,
};

/// Boundary over a shared [`RetrievalOrchestrator`]
#[derive(Clone)]
pub struct TopicApi {
    orchestrator: Arc<RetrievalOrchestrator>,
}

impl TopicApi {
    pub fn new(orchestrator: Arc<RetrievalOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<RetrievalOrchestrator> {
        &self.orchestrator
    }

    /// `None` selects the basic level.
    fn parse_level(level: Option<&str>) -> Result<SummaryLevel, ApiResponse> {
        match level {
            None => Ok(SummaryLevel::Basic),
            Some(raw) => raw
                .parse()
                .map_err(|_| ApiResponse::bad_request("Invalid level.")),
        }
    }

    async fn canonical(&self, topic: &str) -> Result<String, ApiResponse> {
        self.orchestrator
            .resolve_canonical(topic)
            .await
            .ok_or_else(|| ApiResponse::not_found(format!("Could not resolve topic '{}'", topic)))
    }

    pub async fn resolve(&self, input: &str) -> ApiResponse {
        match self.canonical(input).await {
            Ok(topic) => ApiResponse::ok(&ResolvePayload {
                input: input.to_string(),
                topic,
            }),
            Err(response) => response,
        }
    }

    pub async fn article(&self, topic: &str) -> ApiResponse {
        let canonical = match self.canonical(topic).await {
            Ok(canonical) => canonical,
            Err(response) => return response,
        };

        match self.orchestrator.get_article_text(&canonical).await {
            Some(text) => ApiResponse::ok(&ArticlePayload {
                topic: canonical,
                text,
            }),
            None => {
                error!(topic = %canonical, "Failed to retrieve article");
                ApiResponse::internal(format!("Failed to retrieve article for '{}'", canonical))
            }
        }
    }

    pub async fn links(&self, topic: &str) -> ApiResponse {
        let canonical = match self.canonical(topic).await {
            Ok(canonical) => canonical,
            Err(response) => return response,
        };

        match self.orchestrator.get_links(&canonical).await {
            Some(links) => ApiResponse::ok(&LinksPayload {
                topic: canonical,
                links,
            }),
            None => {
                error!(topic = %canonical, "Failed to retrieve links");
                ApiResponse::internal(format!("Failed to retrieve links for '{}'", canonical))
            }
        }
    }

    pub async fn summary(&self, topic: &str, level: Option<&str>) -> ApiResponse {
        let level = match Self::parse_level(level) {
            Ok(level) => level,
            Err(response) => return response,
        };
        let canonical = match self.canonical(topic).await {
            Ok(canonical) => canonical,
            Err(response) => return response,
        };

        match self.orchestrator.get_summary(&canonical, level).await {
            Some(summary) => ApiResponse::ok(&SummaryPayload {
                topic: canonical,
                level: level.to_string(),
                summary,
            }),
            None => {
                error!(topic = %canonical, level = %level, "Failed to retrieve summary");
                ApiResponse::internal(format!("Failed to retrieve summary for '{}'", canonical))
            }
        }
    }

    pub async fn learning_path(&self, topic: &str, level: Option<&str>) -> ApiResponse {
        let level = match Self::parse_level(level) {
            Ok(level) => level,
            Err(response) => return response,
        };
        let canonical = match self.canonical(topic).await {
            Ok(canonical) => canonical,
            Err(response) => return response,
        };

        let summary = self.orchestrator.get_summary(&canonical, level).await;
        match self.orchestrator.get_learning_path(&canonical, level).await {
            Some(links) => ApiResponse::ok(&LearningPathPayload {
                topic: canonical,
                level: level.to_string(),
                summary,
                links,
            }),
            None => {
                error!(topic = %canonical, "Failed to retrieve learning path");
                ApiResponse::internal(format!(
                    "Failed to retrieve learning path for '{}'",
                    canonical
                ))
            }
        }
    }

    pub async fn rerank(&self, topic: &str) -> ApiResponse {
        let canonical = match self.canonical(topic).await {
            Ok(canonical) => canonical,
            Err(response) => return response,
        };

        let Some(links) = self.orchestrator.regenerate_learning_path(&canonical).await else {
            return ApiResponse::internal("Failed to generate learning path");
        };
        let summary = self
            .orchestrator
            .get_summary(&canonical, SummaryLevel::Basic)
            .await;

        info!(topic = %canonical, "Learning path regenerated and stored");
        ApiResponse::ok(&RerankPayload {
            topic: canonical,
            summary,
            links,
        })
    }
}
