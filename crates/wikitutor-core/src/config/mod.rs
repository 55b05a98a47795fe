//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Wikitutor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub generation: GenerationConfig,
    pub cache: CacheConfig,
    pub knowledge: KnowledgeConfig,
    pub storage: StorageConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub default_model: String,
    pub fallback_models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

/// Sampling parameters for the two generation pipelines.
///
/// Summaries run warm so repeated generation varies; ranking runs at zero
/// temperature so identical context produces identical ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub summary_temperature: f32,
    pub summary_max_tokens: usize,
    pub ranker_temperature: f32,
    pub ranker_max_tokens: usize,
    pub learning_path_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
    /// `None` keeps canonical mappings until they are evicted or invalidated.
    pub canonical_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub cache_ms: u64,
    pub store_ms: u64,
    pub knowledge_secs: u64,
    pub generation_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: "anthropic/claude-3-haiku".to_string(),
            fallback_models: vec!["anthropic/claude-3-5-haiku-latest".to_string()],
            temperature: 0.7,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            summary_temperature: 0.7,
            summary_max_tokens: 4096,
            ranker_temperature: 0.0,
            ranker_max_tokens: 1024,
            learning_path_length: 20,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_secs: 86_400,
            canonical_ttl_secs: None,
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            user_agent: "Wikitutor/0.1 (https://github.com/wikitutor/wikitutor)".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            cache_ms: 250,
            store_ms: 5_000,
            knowledge_secs: 45,
            generation_secs: 180,
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("WIKITUTOR_API_KEY")
            .or_else(|_| env::var("OPENROUTER_API_KEY"))
            .ok())
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| opt.map(|key| redact(&key)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn canonical_ttl(&self) -> Option<Duration> {
        self.canonical_ttl_secs.map(Duration::from_secs)
    }
}

impl TimeoutConfig {
    pub fn cache(&self) -> Duration {
        Duration::from_millis(self.cache_ms)
    }

    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn knowledge(&self) -> Duration {
        Duration::from_secs(self.knowledge_secs)
    }

    pub fn generation(&self) -> Duration {
        Duration::from_secs(self.generation_secs)
    }
}

fn redact(key: &str) -> String {
    if key.len() <= 4 {
        "***".to_string()
    } else {
        format!("***{}", &key[key.len() - 4..])
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("WIKITUTOR_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("wikitutor")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Database path, falling back to the config directory
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("wikitutor.db")),
        }
    }

    /// Load configuration from file, or use defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;
        if self.generation.learning_path_length == 0 {
            return Err(anyhow!("generation.learning_path_length must be at least 1"));
        }
        if self.cache.max_entries == 0 {
            return Err(anyhow!("cache.max_entries must be at least 1"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "llm.default_model" => Ok(self.llm.default_model.clone()),
            "llm.fallback_models" => Ok(self.llm.fallback_models.join(", ")),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),

            "generation.summary_temperature" => Ok(self.generation.summary_temperature.to_string()),
            "generation.summary_max_tokens" => Ok(self.generation.summary_max_tokens.to_string()),
            "generation.ranker_temperature" => Ok(self.generation.ranker_temperature.to_string()),
            "generation.ranker_max_tokens" => Ok(self.generation.ranker_max_tokens.to_string()),
            "generation.learning_path_length" => {
                Ok(self.generation.learning_path_length.to_string())
            }

            "cache.max_entries" => Ok(self.cache.max_entries.to_string()),
            "cache.ttl_secs" => Ok(self.cache.ttl_secs.to_string()),
            "cache.canonical_ttl_secs" => Ok(self
                .cache
                .canonical_ttl_secs
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(no expiry)".to_string())),

            "knowledge.api_url" => Ok(self.knowledge.api_url.clone()),
            "knowledge.user_agent" => Ok(self.knowledge.user_agent.clone()),
            "knowledge.timeout_secs" => Ok(self.knowledge.timeout_secs.to_string()),

            "storage.database_path" => Ok(self.database_path()?.display().to_string()),

            "timeouts.cache_ms" => Ok(self.timeouts.cache_ms.to_string()),
            "timeouts.store_ms" => Ok(self.timeouts.store_ms.to_string()),
            "timeouts.knowledge_secs" => Ok(self.timeouts.knowledge_secs.to_string()),
            "timeouts.generation_secs" => Ok(self.timeouts.generation_secs.to_string()),

            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok(
                    "(not set - use WIKITUTOR_API_KEY or OPENROUTER_API_KEY env var)".to_string(),
                ),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `wikitutor config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "llm.default_model" => {
                self.llm.default_model = value.to_string();
            }
            "llm.fallback_models" => {
                self.llm.fallback_models = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = parse_value(key, value)?;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = parse_value(key, value)?;
            }

            "generation.summary_temperature" => {
                self.generation.summary_temperature = parse_temperature(value)?;
            }
            "generation.summary_max_tokens" => {
                self.generation.summary_max_tokens = parse_value(key, value)?;
            }
            "generation.ranker_temperature" => {
                self.generation.ranker_temperature = parse_temperature(value)?;
            }
            "generation.ranker_max_tokens" => {
                self.generation.ranker_max_tokens = parse_value(key, value)?;
            }
            "generation.learning_path_length" => {
                let length: usize = parse_value(key, value)?;
                if length == 0 {
                    return Err(anyhow!("Learning path length must be at least 1"));
                }
                self.generation.learning_path_length = length;
            }

            "cache.max_entries" => {
                self.cache.max_entries = parse_value(key, value)?;
            }
            "cache.ttl_secs" => {
                self.cache.ttl_secs = parse_value(key, value)?;
            }
            "cache.canonical_ttl_secs" => {
                self.cache.canonical_ttl_secs = match value {
                    "" | "none" => None,
                    other => Some(parse_value(key, other)?),
                };
            }

            "knowledge.api_url" => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(anyhow!("knowledge.api_url must be an http(s) URL"));
                }
                self.knowledge.api_url = value.to_string();
            }
            "knowledge.user_agent" => {
                self.knowledge.user_agent = value.to_string();
            }
            "knowledge.timeout_secs" => {
                self.knowledge.timeout_secs = parse_value(key, value)?;
            }

            "storage.database_path" => {
                self.storage.database_path = Some(PathBuf::from(value));
            }

            "timeouts.cache_ms" => {
                self.timeouts.cache_ms = parse_value(key, value)?;
            }
            "timeouts.store_ms" => {
                self.timeouts.store_ms = parse_value(key, value)?;
            }
            "timeouts.knowledge_secs" => {
                self.timeouts.knowledge_secs = parse_value(key, value)?;
            }
            "timeouts.generation_secs" => {
                self.timeouts.generation_secs = parse_value(key, value)?;
            }

            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the WIKITUTOR_API_KEY or OPENROUTER_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `wikitutor config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "llm.default_model",
            "llm.fallback_models",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.api_key",
            "generation.summary_temperature",
            "generation.summary_max_tokens",
            "generation.ranker_temperature",
            "generation.ranker_max_tokens",
            "generation.learning_path_length",
            "cache.max_entries",
            "cache.ttl_secs",
            "cache.canonical_ttl_secs",
            "knowledge.api_url",
            "knowledge.user_agent",
            "knowledge.timeout_secs",
            "storage.database_path",
            "timeouts.cache_ms",
            "timeouts.store_ms",
            "timeouts.knowledge_secs",
            "timeouts.generation_secs",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> anyhow::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", key, value))
}

fn parse_temperature(value: &str) -> anyhow::Result<f32> {
    let temp: f32 = value
        .parse()
        .with_context(|| format!("Invalid temperature value: {}", value))?;
    if !(0.0..=2.0).contains(&temp) {
        return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
    }
    Ok(temp)
}
