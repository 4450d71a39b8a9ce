//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;
use crate::domain::pipeline::StageOutcome;
use crate::domain::resilience::{AttemptRecord, AttemptRecorder};
use crate::domain::{SnapshotOutcome, StageName};

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("workflow_builder_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Record one generation attempt
pub fn record_attempt(stage: StageName, outcome: &str, latency: Duration) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("outcome", outcome.to_string()),
    ];

    counter!("generation_attempts_total", &labels).increment(1);
    histogram!("generation_attempt_duration_seconds", &labels).record(latency.as_secs_f64());
}

pub fn record_circuit_open() {
    counter!("generation_circuit_open_total").increment(1);
}

/// Record the time spent in one pipeline stage
pub fn record_stage(stage: StageName, outcome: StageOutcome, duration: Duration) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("outcome", outcome.as_str().to_string()),
    ];

    histogram!("pipeline_stage_duration_seconds", &labels).record(duration.as_secs_f64());
}

pub fn record_pipeline_run(outcome: SnapshotOutcome) {
    counter!("pipeline_runs_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_cache_lookup(stage: StageName, result: &'static str) {
    counter!(
        "response_cache_lookups_total",
        "stage" => stage.as_str(),
        "result" => result
    )
    .increment(1);
}

pub fn record_validation_score(score: f64) {
    histogram!("validation_score").record(score);
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Attempt recorder that forwards to the metrics facade
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsAttemptRecorder;

impl AttemptRecorder for MetricsAttemptRecorder {
    fn record(&self, record: &AttemptRecord) {
        record_attempt(record.stage, record.outcome.as_str(), record.latency);
    }

    fn circuit_opened(&self) {
        record_circuit_open();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resilience::AttemptOutcome;

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = MetricsConfig { enabled: false };
        assert!(init_metrics(&config).is_none());
    }

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        let recorder = MetricsAttemptRecorder;

        recorder.record(&AttemptRecord {
            stage: StageName::Parse,
            attempt: 1,
            latency: Duration::from_millis(12),
            outcome: AttemptOutcome::Success,
            backoff: None,
        });
        recorder.circuit_opened();
        record_cache_lookup(StageName::Design, "miss");
        record_validation_score(0.8);
    }
}
