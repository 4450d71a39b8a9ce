//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuditConfig, CacheConfig, CacheType, DeliveryConfig, GenerationConfig,
    KnowledgeConfig, LogFormat, LoggingConfig, MetricsConfig, PipelineConfig, ProviderKind,
    ServerConfig, StageTimeouts,
};
