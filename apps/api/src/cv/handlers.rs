use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::cv::demo::{demo_count, load_demo_data, DemoLoadReport};
use crate::cv::ingest::{ingest_document, validate_upload, DocumentMeta};
use crate::errors::AppError;
use crate::matching::similarity::{is_zero_vector, join_ranked, rank_hits, SEARCH_THRESHOLD};
use crate::models::cv::{CvRecord, CvStatus, EmbeddingPreview, SourceType};
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub cv_id: Uuid,
    pub status: CvStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CvDetailResponse {
    #[serde(flatten)]
    pub record: CvRecord,
    pub signed_url: Option<String>,
    pub embedding_preview: EmbeddingPreview,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub record: CvRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub cv_id: Uuid,
    pub status: CvStatus,
}

#[derive(Debug, Serialize)]
pub struct DemoStatusResponse {
    pub demo_count: i64,
    pub total: i64,
}

/// POST /api/cv/ingest
pub async fn handle_ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    let mut file: Option<(Option<String>, String, Vec<u8>)> = None;
    let mut source = SourceType::Upload;
    let mut gdpr_consent = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            Some("source") => {
                let raw = field.text().await.map_err(multipart_error)?;
                source = SourceType::parse(raw.trim())
                    .ok_or_else(|| AppError::Validation(format!("Unknown source: {raw}")))?;
            }
            Some("gdpr_consent") => {
                let raw = field.text().await.map_err(multipart_error)?;
                gdpr_consent = parse_consent(&raw)?;
            }
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
    validate_upload(
        filename.as_deref(),
        &content_type,
        bytes.len(),
        state.config.max_file_size_bytes(),
    )?;

    let meta = DocumentMeta {
        filename: filename.unwrap_or_default(),
        mime_type: content_type,
        file_size_bytes: bytes.len() as i64,
        source,
        gdpr_consent,
    };
    let record = ingest_document(
        &state.pipeline,
        state.store.as_ref(),
        state.blobs.as_ref(),
        bytes,
        meta,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            cv_id: record.id,
            status: record.status,
            message: "CV ingested successfully".to_string(),
        }),
    ))
}

/// GET /api/cv/:id
pub async fn handle_get_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CvDetailResponse>, AppError> {
    let record = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("CV not found".to_string()))?;

    let signed_url = match &record.original_file_path {
        Some(path) => {
            state
                .blobs
                .sign(path, state.config.signed_url_expiry_secs)
                .await
        }
        None => None,
    };

    Ok(Json(CvDetailResponse {
        embedding_preview: record.embedding_preview(),
        signed_url,
        record,
    }))
}

/// GET /api/cv/search
pub async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    if params.page < 1 {
        return Err(AppError::Validation("page must be >= 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&params.limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let offset = (params.page - 1)
        .checked_mul(params.limit)
        .filter(|o| o.checked_add(params.limit).is_some())
        .ok_or_else(|| AppError::Validation("page is out of range".to_string()))?;

    let query = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let (results, total) = match query {
        Some(q) => {
            let embedding = state.pipeline.embedder().embed(q).await;
            if is_zero_vector(embedding.vector()) {
                warn!("Query embedding is zero-filled; semantic search returns nothing");
                (Vec::new(), 0)
            } else {
                let window = offset + params.limit;
                let hits = rank_hits(
                    state
                        .store
                        .nearest(embedding.vector(), SEARCH_THRESHOLD, window)
                        .await?,
                    SEARCH_THRESHOLD,
                    window as usize,
                );
                let total = hits.len() as i64;
                let page: Vec<_> = hits.into_iter().skip(offset as usize).collect();
                let ids: Vec<Uuid> = page.iter().map(|h| h.id).collect();
                let records = state.store.get_many(&ids).await?;
                let results = join_ranked(&page, records)
                    .into_iter()
                    .map(|r| SearchResult {
                        record: r.record,
                        similarity: Some(r.similarity),
                    })
                    .collect();
                (results, total)
            }
        }
        None => {
            let page = state.store.list(offset, params.limit).await?;
            let results = page
                .records
                .into_iter()
                .map(|record| SearchResult {
                    record,
                    similarity: None,
                })
                .collect();
            (results, page.total)
        }
    };

    Ok(Json(SearchResponse {
        results,
        total,
        page: params.page,
        limit: params.limit,
    }))
}

/// DELETE /api/cv/:id
pub async fn handle_delete_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let record = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("CV not found".to_string()))?;

    let blob_removed = match &record.original_file_path {
        Some(path) => match state.blobs.delete(path).await {
            Ok(()) => true,
            Err(e) => {
                warn!(cv_id = %id, "Storage delete failed: {e}");
                false
            }
        },
        None => false,
    };

    if !state.store.mark_deleted(id, blob_removed).await? {
        return Err(AppError::NotFound("CV not found".to_string()));
    }

    Ok(Json(DeleteResponse {
        cv_id: id,
        status: CvStatus::Deleted,
    }))
}

/// GET /api/demo/load
pub async fn handle_demo_load(State(state): State<AppState>) -> Json<DemoLoadReport> {
    Json(load_demo_data(&state.pipeline, state.store.as_ref()).await)
}

/// GET /api/demo/status
pub async fn handle_demo_status(
    State(state): State<AppState>,
) -> Result<Json<DemoStatusResponse>, AppError> {
    let count = demo_count(state.store.as_ref()).await?;
    Ok(Json(DemoStatusResponse {
        demo_count: count,
        total: count,
    }))
}

fn parse_consent(raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Validation(format!(
            "gdpr_consent must be a boolean, got '{other}'"
        ))),
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}
