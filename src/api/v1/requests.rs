//! Generation request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{RawRequest, RequestId, TerminalSnapshot};
use crate::infrastructure::delivery::RequestStatus;

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    /// Run to completion and answer with the terminal snapshot
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitAccepted {
    pub request_id: RequestId,
    pub status: &'static str,
    pub status_url: String,
}

/// POST /v1/requests
pub async fn submit_request(
    State(state): State<AppState>,
    Query(params): Query<SubmitParams>,
    Json(request): Json<RawRequest>,
) -> Response {
    if params.wait {
        let envelope = state.pipeline.run(request).await;
        let snapshot = TerminalSnapshot::from(&envelope);

        return (StatusCode::OK, Json(snapshot)).into_response();
    }

    let request_id = state.pipeline.submit(request);
    info!(request_id = %request_id, "Accepted generation request");

    (
        StatusCode::ACCEPTED,
        Json(SubmitAccepted {
            request_id,
            status: "running",
            status_url: format!("/v1/requests/{}", request_id),
        }),
    )
        .into_response()
}

/// GET /v1/requests/{request_id}
pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<RequestStatus>, ApiError> {
    let request_id = parse_id(&request_id)?;

    state
        .pipeline
        .status(request_id)
        .map(Json)
        .ok_or_else(|| unknown(request_id))
}

/// DELETE /v1/requests/{request_id}
pub async fn cancel_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let request_id = parse_id(&request_id)?;

    if state.pipeline.cancel(request_id) {
        return Ok(StatusCode::ACCEPTED);
    }

    match state.pipeline.status(request_id) {
        Some(_) => Err(ApiError::bad_request(format!(
            "Request '{}' has already finished",
            request_id
        ))
        .with_code("request_finished")),
        None => Err(unknown(request_id)),
    }
}

fn parse_id(value: &str) -> Result<RequestId, ApiError> {
    RequestId::parse(value)
        .ok_or_else(|| ApiError::bad_request(format!("'{}' is not a request id", value)))
}

fn unknown(request_id: RequestId) -> ApiError {
    ApiError::not_found(format!("Request '{}' not found", request_id)).with_code("unknown_request")
}
