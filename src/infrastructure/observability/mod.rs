//! Observability infrastructure - Prometheus metrics

mod metrics;

pub use metrics::{
    init_metrics, record_attempt, record_cache_lookup, record_circuit_open, record_http_request,
    record_pipeline_run, record_stage, record_validation_score, MetricsAttemptRecorder, PrometheusMetrics,
};
