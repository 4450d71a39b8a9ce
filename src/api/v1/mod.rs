//! v1 API endpoints

pub mod knowledge;
pub mod requests;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/requests", post(requests::submit_request))
        .route(
            "/requests/{request_id}",
            get(requests::get_request).delete(requests::cancel_request),
        )
        .route("/knowledge", get(knowledge::get_knowledge))
        .route("/validate", post(knowledge::validate_artifact))
}
