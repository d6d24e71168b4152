pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::cv::handlers as cv;
use crate::matching::handlers as matching;
use crate::state::AppState;

/// Multipart framing and form fields on top of the file itself.
const BODY_LIMIT_SLACK_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size_bytes() + BODY_LIMIT_SLACK_BYTES;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // CV records
        .route("/api/cv/ingest", post(cv::handle_ingest))
        .route("/api/cv/search", get(cv::handle_search))
        .route(
            "/api/cv/:id",
            get(cv::handle_get_cv).delete(cv::handle_delete_cv),
        )
        // Matching & scoring
        .route("/api/matching/semantic", post(matching::handle_semantic_match))
        .route("/api/scoring/candidates", post(matching::handle_score_candidates))
        // Demo data
        .route("/api/demo/load", get(cv::handle_demo_load))
        .route("/api/demo/status", get(cv::handle_demo_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
