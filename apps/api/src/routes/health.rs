use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service status plus which optional collaborators are configured.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "llm_configured": state.pipeline.llm_configured(),
        "embedding_dimension": state.pipeline.embedder().dimension()
    }))
}

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "ATS CV ingestion & matching API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/api/cv", "/api/matching", "/api/scoring", "/api/demo", "/health"]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cv::store::tests::MemoryCvStore;
    use crate::state::tests::test_state;
    use crate::storage::tests::MemoryBlobStore;

    #[tokio::test]
    async fn test_health_reports_degraded_llm() {
        let state = test_state(
            Arc::new(MemoryCvStore::default()),
            Arc::new(MemoryBlobStore::default()),
            None,
        );
        let Json(body) = health_handler(State(state)).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "ats-api");
        assert_eq!(body["llm_configured"], false);
        assert_eq!(body["embedding_dimension"], 384);
    }
}
