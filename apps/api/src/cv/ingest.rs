//! Ingestion: Extractor → Structurer → Normalizer → Embedder → persist.
//!
//! Stages run strictly in order for one document. The only fallible steps
//! are validation (before anything else happens) and persistence; every
//! other stage degrades to an explicit fallback value.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::is_allowed_content_type;
use crate::cv::quality::quality_score;
use crate::cv::store::CvStore;
use crate::embedding::{Embedder, Embedding};
use crate::errors::AppError;
use crate::extraction::{ExtractionResult, Extractor};
use crate::models::cv::{CvRecord, CvStatus, SourceType, DEFAULT_OWNER_ID};
use crate::storage::{object_key, BlobStore};
use crate::structuring::{Structurer, StructuringOutcome};

/// Descriptive fields of an incoming document.
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    pub filename: String,
    pub mime_type: String,
    pub file_size_bytes: i64,
    pub source: SourceType,
    pub gdpr_consent: bool,
}

/// Output of every pipeline stage for one document.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub extraction: ExtractionResult,
    pub structuring: StructuringOutcome,
    pub quality_score: f64,
    pub embedding: Embedding,
}

impl ProcessedDocument {
    pub fn into_record(
        self,
        id: Uuid,
        meta: DocumentMeta,
        original_file_path: Option<String>,
    ) -> CvRecord {
        let now = Utc::now();
        let llm_structured = self.structuring.success();
        let llm_model = self.structuring.model().map(str::to_string);
        CvRecord {
            id,
            user_id: DEFAULT_OWNER_ID,
            original_file_path,
            original_filename: meta.filename,
            mime_type: meta.mime_type,
            file_size_bytes: meta.file_size_bytes,
            raw_text: self.extraction.text,
            structured_data: self.structuring.into_record(),
            embedding: self.embedding.into_vector(),
            quality_score: self.quality_score,
            status: CvStatus::Active,
            source_type: meta.source,
            gdpr_consent: meta.gdpr_consent,
            extraction_method: self.extraction.method,
            extraction_confidence: self.extraction.confidence,
            llm_structured,
            llm_model,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    extractor: Extractor,
    structurer: Structurer,
    embedder: Arc<Embedder>,
}

impl Pipeline {
    pub fn new(extractor: Extractor, structurer: Structurer, embedder: Arc<Embedder>) -> Self {
        Self {
            extractor,
            structurer,
            embedder,
        }
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn llm_configured(&self) -> bool {
        self.structurer.is_configured()
    }

    pub async fn process_document(
        &self,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> ProcessedDocument {
        let extraction = self.extractor.extract(bytes, filename, mime_type).await;
        self.process_extracted(extraction).await
    }

    /// Runs the stages after extraction.
    pub async fn process_extracted(&self, extraction: ExtractionResult) -> ProcessedDocument {
        let structuring = self
            .structurer
            .structure(&extraction.text, &extraction.metadata)
            .await;
        match structuring.error() {
            Some(reason) => warn!("Structuring degraded: {reason}"),
            None => info!(
                confidence = structuring.confidence(),
                sections = structuring.record().sections.len(),
                "CV structured"
            ),
        }
        let quality_score = quality_score(structuring.record());
        let embedding = self.embedder.embed(&extraction.text).await;

        if embedding.is_degraded() {
            warn!("Stored embedding is zero-filled");
        }

        ProcessedDocument {
            extraction,
            structuring,
            quality_score,
            embedding,
        }
    }
}

/// Caller-error checks, applied before any side effect.
pub fn validate_upload(
    filename: Option<&str>,
    content_type: &str,
    size_bytes: usize,
    max_bytes: usize,
) -> Result<(), AppError> {
    match filename {
        Some(name) if !name.trim().is_empty() => {}
        _ => return Err(AppError::Validation("No file provided".to_string())),
    }
    if !is_allowed_content_type(content_type) {
        return Err(AppError::UnsupportedMediaType(format!(
            "Unsupported type: {content_type}"
        )));
    }
    if size_bytes > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File too large (max {} MB)",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Full ingestion of an uploaded file. The original is stored before the
/// record; if the record insert fails the blob is removed best-effort.
pub async fn ingest_document(
    pipeline: &Pipeline,
    store: &dyn CvStore,
    blobs: &dyn BlobStore,
    bytes: Vec<u8>,
    meta: DocumentMeta,
) -> Result<CvRecord, AppError> {
    let cv_id = Uuid::new_v4();
    info!(%cv_id, filename = %meta.filename, mime_type = %meta.mime_type, "Ingesting CV");

    let processed = pipeline
        .process_document(&bytes, &meta.filename, &meta.mime_type)
        .await;

    let key = object_key(DEFAULT_OWNER_ID, cv_id, &meta.filename);
    let path = blobs.put(&key, bytes, &meta.mime_type).await?;

    let record = processed.into_record(cv_id, meta, Some(path.clone()));
    if let Err(e) = store.insert(&record).await {
        if let Err(cleanup) = blobs.delete(&path).await {
            warn!(%cv_id, "Failed to remove orphaned blob {path}: {cleanup}");
        }
        return Err(e);
    }

    info!(
        %cv_id,
        method = record.extraction_method.as_str(),
        llm_structured = record.llm_structured,
        quality = record.quality_score,
        "CV ingested"
    );
    Ok(record)
}

/// Ingestion of already-extracted text. No blob is stored.
pub async fn ingest_text(
    pipeline: &Pipeline,
    store: &dyn CvStore,
    text: &str,
    meta: DocumentMeta,
) -> Result<CvRecord, AppError> {
    let cv_id = Uuid::new_v4();
    let processed = pipeline
        .process_extracted(ExtractionResult::provided(text))
        .await;
    let record = processed.into_record(cv_id, meta, None);
    store.insert(&record).await?;
    Ok(record)
}
