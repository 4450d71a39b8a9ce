//! PMP Workflow Builder
//!
//! Turns a natural-language automation brief into an importable workflow
//! description through a fixed stage pipeline:
//! - parse, design and synthesize call a generative model through a
//!   retrying, circuit-breaking client with a response cache in front
//! - validate and correct check the artifact against a versioned rule set
//!   and apply mechanical fixes

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use config::CacheType;
use domain::pipeline::AuditSink;
use domain::{Cache, LlmProvider, RuleSet};
use infrastructure::{
    audit::{JsonlAuditSink, TracingAuditSink},
    cache::{spawn_sweeper, CacheFactory},
    delivery::WebhookDeliverySink,
    knowledge::load_rule_set,
    llm::LlmProviderFactory,
    pipeline::{PipelineBuilder, PipelineService},
};

/// Everything a running process needs, plus the background tasks it spawned
#[derive(Debug)]
pub struct Runtime {
    pub pipeline: PipelineService,
    pub cache: Arc<dyn Cache>,
    pub rules: Arc<RuleSet>,
    background: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl Runtime {
    /// Stop background tasks and wait for pending audit writes
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        // Dropping the pipeline closes the audit channel so its writer drains
        drop(self.pipeline);

        for handle in self.background {
            let _ = handle.await;
        }
    }
}

/// Load the rule set named in configuration; a broken rule set stops startup
pub fn load_rules(config: &AppConfig) -> anyhow::Result<Arc<RuleSet>> {
    let rules = load_rule_set(&config.knowledge.rules_path).with_context(|| {
        format!(
            "failed to load rule set from {}",
            config.knowledge.rules_path.display()
        )
    })?;

    Ok(Arc::new(rules))
}

/// Assemble the pipeline from configuration with the configured provider
pub async fn build_runtime(config: &AppConfig) -> anyhow::Result<Runtime> {
    let provider = LlmProviderFactory::create(&config.generation)?;
    build_runtime_with_provider(config, provider).await
}

/// Assemble the pipeline around an explicit provider
pub async fn build_runtime_with_provider(
    config: &AppConfig,
    provider: Arc<dyn LlmProvider>,
) -> anyhow::Result<Runtime> {
    let rules = load_rules(config)?;
    let shutdown = CancellationToken::new();
    let mut background = Vec::new();

    let cache = CacheFactory::new().create(&config.cache).await?;
    if config.cache.cache_type == CacheType::InMemory {
        if let Some(secs) = config.cache.sweep_interval_secs.filter(|s| *s > 0) {
            background.push(spawn_sweeper(
                cache.clone(),
                Duration::from_secs(secs),
                shutdown.clone(),
            ));
        }
    }

    let audit: Arc<dyn AuditSink> = match &config.audit.path {
        Some(path) => {
            let (sink, writer) = JsonlAuditSink::open(path).await?;
            background.push(writer);
            Arc::new(sink)
        }
        None => Arc::new(TracingAuditSink),
    };

    let mut builder = PipelineBuilder::new(config.clone(), provider, rules.clone())
        .with_cache(cache.clone())
        .with_audit(audit);

    if let Some(url) = &config.delivery.webhook_url {
        let webhook = WebhookDeliverySink::new(
            url.clone(),
            Duration::from_millis(config.delivery.timeout_ms),
        )?;
        builder = builder.with_delivery(Arc::new(webhook));
    }

    let pipeline = builder.build()?;

    info!(
        provider = ?config.generation.provider,
        cache = %config.cache.cache_type,
        rules = rules.len(),
        "Runtime ready"
    );

    Ok(Runtime {
        pipeline,
        cache,
        rules,
        background,
        shutdown,
    })
}
