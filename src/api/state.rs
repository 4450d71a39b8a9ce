//! Application state shared by the HTTP handlers

use std::sync::Arc;

use crate::domain::Cache;
use crate::infrastructure::observability::PrometheusMetrics;
use crate::infrastructure::pipeline::PipelineService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: PipelineService,
    /// Response cache backend, when caching is enabled
    pub cache: Option<Arc<dyn Cache>>,
    pub metrics: Option<PrometheusMetrics>,
}

impl AppState {
    pub fn new(pipeline: PipelineService) -> Self {
        Self {
            pipeline,
            cache: None,
            metrics: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: Option<PrometheusMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}
