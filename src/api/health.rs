//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;
use crate::domain::CircuitState;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus, message: Option<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        }
    }
}

/// Liveness with version info
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness: model circuit, rule set and cache backend.
///
/// None of these make the service unready; requests are still accepted while
/// the circuit is open or the cache is down.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let checks = vec![
        check_generation(&state),
        check_knowledge(&state),
        check_cache(&state).await,
    ];

    let overall_status = checks
        .iter()
        .map(|c| c.status)
        .fold(HealthStatus::Healthy, |acc, status| match (acc, status) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        });

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

fn check_generation(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    match state.pipeline.circuit_state() {
        CircuitState::Closed => HealthCheck::new("generation", HealthStatus::Healthy, None, start),
        CircuitState::HalfOpen => HealthCheck::new(
            "generation",
            HealthStatus::Degraded,
            Some("circuit half-open, probing the model".to_string()),
            start,
        ),
        CircuitState::Open => HealthCheck::new(
            "generation",
            HealthStatus::Degraded,
            Some("circuit open, model calls fail fast".to_string()),
            start,
        ),
    }
}

fn check_knowledge(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let rules = state.pipeline.validator().rule_set();

    if rules.is_empty() {
        HealthCheck::new(
            "knowledge",
            HealthStatus::Degraded,
            Some("rule set is empty; every artifact passes".to_string()),
            start,
        )
    } else {
        HealthCheck::new(
            "knowledge",
            HealthStatus::Healthy,
            Some(format!("{} rules, version {}", rules.len(), rules.version())),
            start,
        )
    }
}

async fn check_cache(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    let Some(cache) = &state.cache else {
        return HealthCheck::new(
            "cache",
            HealthStatus::Healthy,
            Some("disabled".to_string()),
            start,
        );
    };

    // The pipeline tolerates cache outages, so a failing backend only degrades
    match cache.exists("health:probe").await {
        Ok(_) => HealthCheck::new("cache", HealthStatus::Healthy, None, start),
        Err(e) => HealthCheck::new("cache", HealthStatus::Degraded, Some(e.to_string()), start),
    }
}
