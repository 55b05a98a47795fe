//! Health API
//!
//! System health checks for the `doctor` command.

use serde::{Deserialize, Serialize};

use crate::cache::AdvisoryCache;
use crate::config::Config;
use crate::storage::Database;

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: Some(message.into()),
        }
    }
}

/// Ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Warning,
    Error,
}

/// Overall system health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub timestamp: String,
}

impl HealthReport {
    fn from_checks(checks: Vec<HealthCheck>) -> Self {
        let overall_status = checks
            .iter()
            .map(|check| check.status)
            .max()
            .unwrap_or(HealthStatus::Ok);

        Self {
            overall_status,
            checks,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Run all health checks
pub async fn doctor(config: &Config, database: &Database, cache: &AdvisoryCache) -> HealthReport {
    HealthReport::from_checks(vec![
        check_database(database).await,
        check_config(config),
        check_api_key(config),
        check_cache(cache).await,
    ])
}

async fn check_database(database: &Database) -> HealthCheck {
    const NAME: &str = "Database";

    if let Err(e) = database.health_check().await {
        return HealthCheck::new(NAME, HealthStatus::Error, format!("Query failed: {:#}", e));
    }

    match database.migration_status().await {
        Ok(status) if status.needs_migration => HealthCheck::new(
            NAME,
            HealthStatus::Warning,
            format!(
                "Schema at version {} of {}",
                status.current_version, status.target_version
            ),
        ),
        Ok(status) => HealthCheck::new(
            NAME,
            HealthStatus::Ok,
            format!(
                "Connected at {} (schema v{})",
                database.path().display(),
                status.current_version
            ),
        ),
        Err(e) => HealthCheck::new(
            NAME,
            HealthStatus::Error,
            format!("Migration status unavailable: {:#}", e),
        ),
    }
}

fn check_config(config: &Config) -> HealthCheck {
    const NAME: &str = "Configuration";

    if let Err(e) = config.validate() {
        return HealthCheck::new(NAME, HealthStatus::Error, format!("Invalid: {:#}", e));
    }

    match Config::config_path() {
        Ok(path) if path.exists() => {
            HealthCheck::new(NAME, HealthStatus::Ok, format!("Found at {}", path.display()))
        }
        Ok(path) => HealthCheck::new(
            NAME,
            HealthStatus::Warning,
            format!("Not found at {} (using defaults)", path.display()),
        ),
        Err(e) => HealthCheck::new(
            NAME,
            HealthStatus::Warning,
            format!("Could not determine config directory: {:#}", e),
        ),
    }
}

fn check_api_key(config: &Config) -> HealthCheck {
    const NAME: &str = "API Key";

    match config.llm.redacted_api_key() {
        Ok(Some(redacted)) => HealthCheck::new(NAME, HealthStatus::Ok, format!("Set ({})", redacted)),
        Ok(None) => HealthCheck::new(
            NAME,
            HealthStatus::Warning,
            "Not set; summaries and learning paths are unavailable. \
             Export WIKITUTOR_API_KEY or OPENROUTER_API_KEY.",
        ),
        Err(e) => HealthCheck::new(NAME, HealthStatus::Error, format!("{:#}", e)),
    }
}

async fn check_cache(cache: &AdvisoryCache) -> HealthCheck {
    const NAME: &str = "Cache";

    match cache.round_trip().await {
        Ok(()) => HealthCheck::new(NAME, HealthStatus::Ok, "Round trip succeeded"),
        // The cache is advisory, so a broken one only degrades performance.
        Err(e) => HealthCheck::new(NAME, HealthStatus::Warning, format!("Round trip failed: {}", e)),
    }
}
