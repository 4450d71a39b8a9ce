use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;
use super::v1;

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .route("/metrics", get(render_metrics))
        .nest("/v1", v1::create_v1_router())
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(metrics) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::domain::llm::MockLlmProvider;
    use crate::infrastructure::knowledge::load_rule_set;
    use crate::infrastructure::pipeline::PipelineBuilder;

    const ARTIFACT: &str = r#"{"name": "Lead Sync", "nodes": [{"name": "Every Hour", "type": "scheduleTrigger"}, {"name": "Notify", "type": "slack"}], "connections": [{"from": "Every Hour", "to": "Notify"}], "settings": {"errorWorkflow": "alerts"}}"#;

    fn app() -> Router {
        let rules = load_rule_set(&Path::new(env!("CARGO_MANIFEST_DIR")).join("knowledge/rules.toml"))
            .unwrap();
        let provider = MockLlmProvider::new("mock")
            .with_route("Extract the requirements", r#"{"goal": "notify"}"#)
            .with_route("Design the workflow", r#"{"steps": []}"#)
            .with_route("Produce the workflow JSON", ARTIFACT);

        let pipeline = PipelineBuilder::new(AppConfig::default(), Arc::new(provider), Arc::new(rules))
            .build()
            .unwrap();

        create_router_with_state(AppState::new(pipeline))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let response = app()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_submit_and_wait_returns_snapshot() {
        let response = app()
            .oneshot(post(
                "/v1/requests?wait=true",
                json!({"brief": "Post every hour to the team channel", "contact_ref": "ops@example.com"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["outcome"], "validated");
        assert_eq!(body["artifact"]["name"], "Lead Sync");
        assert_eq!(body["validation"]["score"], 1.0);
    }

    #[tokio::test]
    async fn test_submit_async_then_poll() {
        let app = app();

        let response = app
            .clone()
            .oneshot(post(
                "/v1/requests",
                json!({"brief": "Post every hour to the team channel", "contact_ref": "ops@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = body_json(response).await;
        let status_url = body["status_url"].as_str().unwrap().to_string();

        let response = app
            .oneshot(Request::get(status_url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_request_is_404() {
        let uri = format!("/v1/requests/{}", crate::domain::RequestId::new());
        let response = app()
            .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "not_found_error");

        let response = app()
            .oneshot(Request::get("/v1/requests/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_validate_with_correction() {
        let artifact: Value = json!({
            "name": "lead sync",
            "nodes": [
                {"name": "Start", "type": "manualTrigger"},
                {"name": "Fetch", "type": "httpRequest"}
            ],
            "connections": [{"from": "Start", "to": "Fetch"}],
            "settings": {"errorWorkflow": "alerts"}
        });

        let response = app()
            .oneshot(post("/v1/validate", json!({"artifact": artifact, "correct": true})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["score"].as_f64().unwrap() < 1.0);
        assert_eq!(body["corrected"]["applied_count"], 2);
        assert_eq!(body["corrected"]["result"]["score"], 1.0);
        assert_eq!(body["corrected"]["artifact"]["name"], "Generated Workflow");
    }

    #[tokio::test]
    async fn test_knowledge_listing() {
        let response = app()
            .oneshot(Request::get("/v1/knowledge").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["version"], "2024.11.1");
        assert_eq!(body["rules"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_metrics_disabled_is_404() {
        let response = app()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
