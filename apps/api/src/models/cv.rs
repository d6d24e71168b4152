use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

use crate::extraction::ExtractionMethod;
use crate::structuring::models::StructuredRecord;

/// Owner used for every record until authentication exists.
pub const DEFAULT_OWNER_ID: Uuid = Uuid::nil();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvStatus {
    Processing,
    Active,
    Deleted,
}

impl CvStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CvStatus::Processing => "processing",
            CvStatus::Active => "active",
            CvStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(CvStatus::Processing),
            "active" => Some(CvStatus::Active),
            "deleted" => Some(CvStatus::Deleted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Upload,
    Demo,
    Sample,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Upload => "upload",
            SourceType::Demo => "demo",
            SourceType::Sample => "sample",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upload" => Some(SourceType::Upload),
            "demo" => Some(SourceType::Demo),
            "sample" => Some(SourceType::Sample),
            _ => None,
        }
    }
}

/// The persisted aggregate. Created once at the end of ingestion; afterwards
/// only `original_file_path`, `status` and `updated_at` change.
#[derive(Debug, Clone, Serialize)]
pub struct CvRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_file_path: Option<String>,
    pub original_filename: String,
    pub mime_type: String,
    pub file_size_bytes: i64,
    pub raw_text: String,
    pub structured_data: StructuredRecord,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    pub quality_score: f64,
    pub status: CvStatus,
    pub source_type: SourceType,
    pub gdpr_consent: bool,
    pub extraction_method: ExtractionMethod,
    pub extraction_confidence: f64,
    pub llm_structured: bool,
    pub llm_model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingPreview {
    pub dimension: usize,
    pub first_5: Vec<f32>,
}

impl CvRecord {
    pub fn embedding_preview(&self) -> EmbeddingPreview {
        EmbeddingPreview {
            dimension: self.embedding.len(),
            first_5: self.embedding.iter().take(5).copied().collect(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CvRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_file_path: Option<String>,
    pub original_filename: String,
    pub mime_type: String,
    pub file_size_bytes: i64,
    pub raw_text: String,
    pub structured_data: Value,
    pub embedding: Vector,
    pub quality_score: f64,
    pub status: String,
    pub source_type: String,
    pub gdpr_consent: bool,
    pub extraction_method: String,
    pub extraction_confidence: f64,
    pub llm_structured: bool,
    pub llm_model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CvRow> for CvRecord {
    fn from(row: CvRow) -> Self {
        let structured_data = serde_json::from_value(row.structured_data).unwrap_or_else(|e| {
            warn!("CV {} has unreadable structured_data: {e}", row.id);
            StructuredRecord::empty()
        });
        CvRecord {
            id: row.id,
            user_id: row.user_id,
            original_file_path: row.original_file_path,
            original_filename: row.original_filename,
            mime_type: row.mime_type,
            file_size_bytes: row.file_size_bytes,
            raw_text: row.raw_text,
            structured_data,
            embedding: row.embedding.to_vec(),
            quality_score: row.quality_score,
            status: CvStatus::parse(&row.status).unwrap_or(CvStatus::Processing),
            source_type: SourceType::parse(&row.source_type).unwrap_or(SourceType::Upload),
            gdpr_consent: row.gdpr_consent,
            extraction_method: ExtractionMethod::parse(&row.extraction_method),
            extraction_confidence: row.extraction_confidence,
            llm_structured: row.llm_structured,
            llm_model: row.llm_model,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Active upload record created `age_secs` ago.
    pub(crate) fn record_with(
        structured_data: StructuredRecord,
        quality_score: f64,
        age_secs: i64,
    ) -> CvRecord {
        let created_at = Utc::now() - chrono::Duration::seconds(age_secs);
        CvRecord {
            id: Uuid::new_v4(),
            user_id: DEFAULT_OWNER_ID,
            original_file_path: None,
            original_filename: "cv.pdf".into(),
            mime_type: "application/pdf".into(),
            file_size_bytes: 0,
            raw_text: String::new(),
            structured_data,
            embedding: vec![0.0; 4],
            quality_score,
            status: CvStatus::Active,
            source_type: SourceType::Upload,
            gdpr_consent: false,
            extraction_method: ExtractionMethod::Primary,
            extraction_confidence: 0.95,
            llm_structured: false,
            llm_model: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn row() -> CvRow {
        CvRow {
            id: Uuid::new_v4(),
            user_id: DEFAULT_OWNER_ID,
            original_file_path: Some("owner/cv/file.pdf".into()),
            original_filename: "file.pdf".into(),
            mime_type: "application/pdf".into(),
            file_size_bytes: 10,
            raw_text: "text".into(),
            structured_data: json!({"candidate_info": {"full_name": "Jane"}, "sections": []}),
            embedding: Vector::from(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]),
            quality_score: 0.3,
            status: "active".into(),
            source_type: "demo".into(),
            gdpr_consent: true,
            extraction_method: "fallback-pdf".into(),
            extraction_confidence: 0.7,
            llm_structured: true,
            llm_model: Some("llama".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_converts_to_record() {
        let record = CvRecord::from(row());
        assert_eq!(record.status, CvStatus::Active);
        assert_eq!(record.source_type, SourceType::Demo);
        assert_eq!(record.extraction_method, ExtractionMethod::FallbackPdf);
        assert_eq!(record.structured_data.candidate_info.full_name(), Some("Jane"));
    }

    #[test]
    fn test_unreadable_structured_data_degrades_to_empty() {
        let mut bad = row();
        bad.structured_data = json!("not an object");
        let record = CvRecord::from(bad);
        assert_eq!(record.structured_data, StructuredRecord::empty());
    }

    #[test]
    fn test_embedding_preview_and_serialization() {
        let record = CvRecord::from(row());
        let preview = record.embedding_preview();
        assert_eq!(preview.dimension, 6);
        assert_eq!(preview.first_5, vec![0.1, 0.2, 0.3, 0.4, 0.5]);

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("embedding").is_none());
        assert_eq!(value["status"], "active");
        assert_eq!(value["extraction_method"], "fallback-pdf");
    }

    #[test]
    fn test_status_and_source_parse() {
        assert_eq!(CvStatus::parse("deleted"), Some(CvStatus::Deleted));
        assert_eq!(CvStatus::parse("gone"), None);
        assert_eq!(SourceType::parse("sample"), Some(SourceType::Sample));
        assert_eq!(SourceType::parse("email"), None);
    }
}
