//! Wires stages, generation client, cache and sinks into a pipeline service

use std::sync::Arc;

use tracing::info;

use super::orchestrator::StageOrchestrator;
use super::service::PipelineService;
use super::stages::{
    CorrectStage, DesignStage, ModelStageDeps, ParseStage, SynthesizeStage, ValidateStage,
};
use crate::config::AppConfig;
use crate::domain::pipeline::{AuditSink, DeliverySink, Stage};
use crate::domain::resilience::AttemptRecorder;
use crate::domain::{
    Cache, CircuitBreaker, DomainError, KnowledgeValidator, LlmProvider, ResponseCache, RuleSet,
    StagePrompts,
};
use crate::infrastructure::audit::TracingAuditSink;
use crate::infrastructure::delivery::{FanoutDeliverySink, InMemoryRequestStore};
use crate::infrastructure::generation::ResilientGenerationClient;
use crate::infrastructure::observability::MetricsAttemptRecorder;

pub struct PipelineBuilder {
    config: AppConfig,
    provider: Arc<dyn LlmProvider>,
    rules: Arc<RuleSet>,
    cache: Option<Arc<dyn Cache>>,
    audit: Arc<dyn AuditSink>,
    recorder: Arc<dyn AttemptRecorder>,
    sinks: Vec<Arc<dyn DeliverySink>>,
}

impl PipelineBuilder {
    pub fn new(config: AppConfig, provider: Arc<dyn LlmProvider>, rules: Arc<RuleSet>) -> Self {
        Self {
            config,
            provider,
            rules,
            cache: None,
            audit: Arc::new(TracingAuditSink),
            recorder: Arc::new(MetricsAttemptRecorder),
            sinks: Vec::new(),
        }
    }

    /// Enable the response cache over the given backend
    pub fn with_cache(mut self, backend: Arc<dyn Cache>) -> Self {
        self.cache = Some(backend);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn AttemptRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Additional recipient of terminal snapshots; the request store always gets one
    pub fn with_delivery(mut self, sink: Arc<dyn DeliverySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn build(self) -> Result<PipelineService, DomainError> {
        let config = self.config;

        let prompts = StagePrompts::new(&config.prompts)
            .map_err(|e| DomainError::configuration(format!("Invalid prompt template: {}", e)))?;

        let generation = Arc::new(
            ResilientGenerationClient::new(self.provider, config.generation.model.clone())
                .with_policy(config.retry.clone())
                .with_breaker(Arc::new(CircuitBreaker::new(config.circuit_breaker.clone())))
                .with_recorder(self.recorder)
                .with_sampling(config.generation.temperature, config.generation.max_tokens),
        );

        let mut deps = ModelStageDeps::new(generation.clone(), Arc::new(prompts), config.stages.clone());
        if let Some(backend) = self.cache {
            deps = deps.with_cache(
                ResponseCache::new(backend, config.cache.ttl())
                    .with_key_prefix(config.cache.key_prefix.clone()),
            );
        }

        let validator = KnowledgeValidator::new(self.rules);

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(ParseStage::new(deps.clone())),
            Arc::new(DesignStage::new(deps.clone())),
            Arc::new(SynthesizeStage::new(deps)),
            Arc::new(ValidateStage::new(validator.clone())),
            Arc::new(CorrectStage::new(validator.clone())),
        ];

        let orchestrator =
            StageOrchestrator::new(stages, self.audit, config.pipeline.min_brief_len)?;

        let store = Arc::new(InMemoryRequestStore::new());
        let delivery = self
            .sinks
            .into_iter()
            .fold(FanoutDeliverySink::new().with_sink(store.clone()), |fanout, sink| {
                fanout.with_sink(sink)
            });

        info!(
            model = %config.generation.model,
            rule_set_version = %validator.rule_set().version(),
            max_concurrent = config.pipeline.max_concurrent_requests,
            "Pipeline assembled"
        );

        Ok(PipelineService::new(
            Arc::new(orchestrator),
            generation,
            validator,
            store,
            Arc::new(delivery),
            &config.pipeline,
        ))
    }
}
