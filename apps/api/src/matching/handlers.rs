use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::scoring::{score_candidates, CandidateScore, ScoringWeights};
use crate::matching::similarity::{is_zero_vector, join_ranked, rank_hits, MATCHING_THRESHOLD};
use crate::models::cv::CvRecord;
use crate::state::AppState;

const MAX_TOP_N: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SemanticMatchRequest {
    pub job_description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    10
}

impl SemanticMatchRequest {
    /// Job description followed by the required skills, space separated.
    pub fn query_text(&self) -> String {
        let mut text = self.job_description.trim().to_string();
        for skill in self.required_skills.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            text.push(' ');
            text.push_str(skill);
        }
        text
    }
}

#[derive(Debug, Serialize)]
pub struct SemanticMatch {
    pub cv: CvRecord,
    pub similarity_score: f64,
}

#[derive(Debug, Serialize)]
pub struct SemanticMatchResponse {
    pub query: String,
    pub results: Vec<SemanticMatch>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ScoringRequest {
    pub cv_ids: Vec<Uuid>,
    /// Absent or null means the default weights.
    #[serde(default)]
    pub criteria: Option<ScoringWeights>,
}

#[derive(Debug, Serialize)]
pub struct ScoringResponse {
    pub results: Vec<CandidateScore>,
    pub total: usize,
    pub criteria: ScoringWeights,
}

/// POST /api/matching/semantic
pub async fn handle_semantic_match(
    State(state): State<AppState>,
    Json(req): Json<SemanticMatchRequest>,
) -> Result<Json<SemanticMatchResponse>, AppError> {
    if req.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description must not be empty".to_string(),
        ));
    }
    if !(1..=MAX_TOP_N).contains(&req.top_n) {
        return Err(AppError::Validation(format!(
            "top_n must be between 1 and {MAX_TOP_N}"
        )));
    }

    let embedding = state.pipeline.embedder().embed(&req.query_text()).await;
    if is_zero_vector(embedding.vector()) {
        warn!("Job description embedding is zero-filled; no semantic matches");
        return Ok(Json(SemanticMatchResponse {
            query: req.job_description,
            results: Vec::new(),
            total: 0,
        }));
    }

    let hits = rank_hits(
        state
            .store
            .nearest(embedding.vector(), MATCHING_THRESHOLD, req.top_n as i64)
            .await?,
        MATCHING_THRESHOLD,
        req.top_n,
    );
    let ids: Vec<Uuid> = hits.iter().map(|h| h.id).collect();
    let records = state.store.get_many(&ids).await?;

    let results: Vec<SemanticMatch> = join_ranked(&hits, records)
        .into_iter()
        .map(|r| SemanticMatch {
            cv: r.record,
            similarity_score: r.similarity,
        })
        .collect();

    info!(matches = results.len(), "Semantic matching complete");
    Ok(Json(SemanticMatchResponse {
        query: req.job_description,
        total: results.len(),
        results,
    }))
}

/// POST /api/scoring/candidates
pub async fn handle_score_candidates(
    State(state): State<AppState>,
    Json(req): Json<ScoringRequest>,
) -> Result<Json<ScoringResponse>, AppError> {
    let records = state.store.get_many(&req.cv_ids).await?;
    if records.len() < req.cv_ids.len() {
        warn!(
            requested = req.cv_ids.len(),
            found = records.len(),
            "Skipping unknown CV ids in scoring request"
        );
    }

    let criteria = req.criteria.unwrap_or_default();
    let results = score_candidates(&records, &criteria);
    Ok(Json(ScoringResponse {
        total: results.len(),
        results,
        criteria,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cv::store::tests::MemoryCvStore;
    use crate::cv::store::CvStore;
    use crate::embedding::tests::HashModel;
    use crate::embedding::{l2_normalize, EmbeddingModel};
    use crate::models::cv::tests::record_with;
    use crate::state::tests::test_state;
    use crate::storage::tests::MemoryBlobStore;
    use crate::structuring::models::StructuredRecord;

    #[test]
    fn test_query_text_appends_skills() {
        let req: SemanticMatchRequest = serde_json::from_value(serde_json::json!({
            "job_description": "Backend engineer ",
            "required_skills": ["Rust", " ", "Postgres"]
        }))
        .unwrap();
        assert_eq!(req.query_text(), "Backend engineer Rust Postgres");
        assert_eq!(req.top_n, 10);
    }

    #[tokio::test]
    async fn test_semantic_match_returns_similar_records_only() {
        let model = HashModel { dimension: 8 };
        let store = Arc::new(MemoryCvStore::default());

        let mut close = record_with(StructuredRecord::empty(), 0.0, 0);
        close.embedding = l2_normalize(model.encode("Backend engineer Rust").await.unwrap());
        let mut far = record_with(StructuredRecord::empty(), 0.0, 0);
        far.embedding = l2_normalize(vec![-1.0; 8]);
        store.insert(&close).await.unwrap();
        store.insert(&far).await.unwrap();

        let state = test_state(store, Arc::new(MemoryBlobStore::default()), Some(8));
        let Json(resp) = handle_semantic_match(
            State(state),
            Json(SemanticMatchRequest {
                job_description: "Backend engineer".into(),
                required_skills: vec!["Rust".into()],
                top_n: 10,
            }),
        )
        .await
        .unwrap();

        assert_eq!(resp.total, 1);
        assert_eq!(resp.results[0].cv.id, close.id);
        assert!(resp.results[0].similarity_score > MATCHING_THRESHOLD);
    }

    #[tokio::test]
    async fn test_semantic_match_rejects_empty_description() {
        let state = test_state(
            Arc::new(MemoryCvStore::default()),
            Arc::new(MemoryBlobStore::default()),
            None,
        );
        let result = handle_semantic_match(
            State(state),
            Json(SemanticMatchRequest {
                job_description: "  ".into(),
                required_skills: vec![],
                top_n: 10,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_scoring_skips_unknown_ids_and_defaults_criteria() {
        let store = Arc::new(MemoryCvStore::default());
        let known = record_with(StructuredRecord::empty(), 1.0, 0);
        store.insert(&known).await.unwrap();

        let state = test_state(store, Arc::new(MemoryBlobStore::default()), None);
        let req: ScoringRequest = serde_json::from_value(serde_json::json!({
            "cv_ids": [known.id, Uuid::new_v4()]
        }))
        .unwrap();
        let Json(resp) = handle_score_candidates(State(state), Json(req)).await.unwrap();

        assert_eq!(resp.total, 1);
        assert_eq!(resp.results[0].cv_id, known.id);
        assert_eq!(resp.results[0].total_score, 0.1);
        assert_eq!(resp.criteria, ScoringWeights::default());
    }

    #[tokio::test]
    async fn test_null_criteria_uses_default_weights() {
        let store = Arc::new(MemoryCvStore::default());
        let known = record_with(StructuredRecord::empty(), 1.0, 0);
        store.insert(&known).await.unwrap();

        let state = test_state(store, Arc::new(MemoryBlobStore::default()), None);
        let req: ScoringRequest = serde_json::from_value(serde_json::json!({
            "cv_ids": [known.id],
            "criteria": null
        }))
        .unwrap();
        let Json(resp) = handle_score_candidates(State(state), Json(req)).await.unwrap();

        assert_eq!(resp.criteria, ScoringWeights::default());
        assert_eq!(resp.results[0].total_score, 0.1);
    }
}
