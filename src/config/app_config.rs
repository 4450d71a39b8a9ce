use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{CircuitBreakerConfig, PromptOverrides, RetryPolicy, StageName};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub generation: GenerationConfig,
    pub retry: RetryPolicy,
    pub circuit_breaker: CircuitBreakerConfig,
    pub stages: StageTimeouts,
    pub cache: CacheConfig,
    pub knowledge: KnowledgeConfig,
    pub pipeline: PipelineConfig,
    pub audit: AuditConfig,
    pub delivery: DeliveryConfig,
    pub prompts: PromptOverrides,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

/// Which generative model API to talk to
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: ProviderKind,
    /// Overrides the provider's public endpoint
    pub base_url: Option<String>,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Per-attempt timeouts of the model-calling stages
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StageTimeouts {
    pub parse_ms: u64,
    pub design_ms: u64,
    pub synthesize_ms: u64,
}

impl StageTimeouts {
    pub fn for_stage(&self, stage: StageName) -> Duration {
        let ms = match stage {
            StageName::Parse => self.parse_ms,
            StageName::Design => self.design_ms,
            _ => self.synthesize_ms,
        };

        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    #[default]
    InMemory,
    Redis,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(rename = "type")]
    pub cache_type: CacheType,
    /// Required for the redis backend
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub ttl_secs: u64,
    /// In-memory backend only
    pub max_capacity: u64,
    /// In-memory backend only; no sweep when unset
    pub sweep_interval_secs: Option<u64>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub rules_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub min_brief_len: usize,
    /// Whole-request deadline; cancels the run when exceeded
    pub request_deadline_ms: u64,
    pub max_concurrent_requests: usize,
}

impl PipelineConfig {
    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSON-lines file; audit records only go to the log when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub webhook_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: Some(0.2),
            max_tokens: None,
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            parse_ms: 15_000,
            design_ms: 30_000,
            synthesize_ms: 90_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::default(),
            redis_url: None,
            key_prefix: "response".to_string(),
            ttl_secs: 3600,
            max_capacity: 10_000,
            sweep_interval_secs: Some(300),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("knowledge/rules.toml"),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_brief_len: 5,
            request_deadline_ms: 300_000,
            max_concurrent_requests: 16,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: 10_000,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Layered load: defaults, local overrides, an optional explicit file,
    /// then `APP__SECTION__KEY` environment variables.
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
