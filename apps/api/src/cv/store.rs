//! Record persistence: PostgreSQL with a pgvector `embedding` column.
//!
//! Deleted rows stay in the table but are invisible to every read here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::similarity::SimilarityHit;
use crate::models::cv::{CvRecord, CvRow, CvStatus, SourceType};

const CV_COLUMNS: &str = "id, user_id, original_file_path, original_filename, mime_type, \
     file_size_bytes, raw_text, structured_data, embedding, quality_score, status, source_type, \
     gdpr_consent, extraction_method, extraction_confidence, llm_structured, llm_model, \
     created_at, updated_at";

/// A page of records plus the total number of visible records.
#[derive(Debug, Clone)]
pub struct CvPage {
    pub records: Vec<CvRecord>,
    pub total: i64,
}

#[async_trait]
pub trait CvStore: Send + Sync {
    async fn insert(&self, record: &CvRecord) -> Result<(), AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<CvRecord>, AppError>;

    /// Records for the given ids, in no particular order; unknown ids are skipped.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<CvRecord>, AppError>;

    /// Newest first.
    async fn list(&self, offset: i64, limit: i64) -> Result<CvPage, AppError>;

    /// Up to `limit` records with cosine similarity strictly above `threshold`.
    async fn nearest(
        &self,
        query: &[f32],
        threshold: f64,
        limit: i64,
    ) -> Result<Vec<SimilarityHit>, AppError>;

    /// Sets status to `deleted`; clears the storage path when `clear_path`.
    /// Returns false when no visible record had that id.
    async fn mark_deleted(&self, id: Uuid, clear_path: bool) -> Result<bool, AppError>;

    async fn count_by_source(&self, source: SourceType) -> Result<i64, AppError>;
}

pub struct PgCvStore {
    pool: PgPool,
}

impl PgCvStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CvStore for PgCvStore {
    async fn insert(&self, record: &CvRecord) -> Result<(), AppError> {
        let structured = serde_json::to_value(&record.structured_data)
            .map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO cv_documents
                (id, user_id, original_file_path, original_filename, mime_type,
                 file_size_bytes, raw_text, structured_data, embedding, quality_score,
                 status, source_type, gdpr_consent, extraction_method,
                 extraction_confidence, llm_structured, llm_model, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.original_file_path)
        .bind(&record.original_filename)
        .bind(&record.mime_type)
        .bind(record.file_size_bytes)
        .bind(&record.raw_text)
        .bind(structured)
        .bind(Vector::from(record.embedding.clone()))
        .bind(record.quality_score)
        .bind(record.status.as_str())
        .bind(record.source_type.as_str())
        .bind(record.gdpr_consent)
        .bind(record.extraction_method.as_str())
        .bind(record.extraction_confidence)
        .bind(record.llm_structured)
        .bind(&record.llm_model)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(cv_id = %record.id, "Inserted CV record");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<CvRecord>, AppError> {
        let row: Option<CvRow> = sqlx::query_as(&format!(
            "SELECT {CV_COLUMNS} FROM cv_documents WHERE id = $1 AND status <> 'deleted'"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CvRecord::from))
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<CvRecord>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<CvRow> = sqlx::query_as(&format!(
            "SELECT {CV_COLUMNS} FROM cv_documents WHERE id = ANY($1) AND status <> 'deleted'"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CvRecord::from).collect())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<CvPage, AppError> {
        let rows: Vec<CvRow> = sqlx::query_as(&format!(
            "SELECT {CV_COLUMNS} FROM cv_documents WHERE status <> 'deleted' \
             ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cv_documents WHERE status <> 'deleted'")
                .fetch_one(&self.pool)
                .await?;

        Ok(CvPage {
            records: rows.into_iter().map(CvRecord::from).collect(),
            total,
        })
    }

    async fn nearest(
        &self,
        query: &[f32],
        threshold: f64,
        limit: i64,
    ) -> Result<Vec<SimilarityHit>, AppError> {
        let rows: Vec<(Uuid, f64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, 1 - (embedding <=> $1) AS similarity, created_at
            FROM cv_documents
            WHERE status <> 'deleted' AND 1 - (embedding <=> $1) > $2
            ORDER BY embedding <=> $1, created_at, id
            LIMIT $3
            "#,
        )
        .bind(Vector::from(query.to_vec()))
        .bind(threshold)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, similarity, created_at)| SimilarityHit {
                id,
                similarity,
                created_at,
            })
            .collect())
    }

    async fn mark_deleted(&self, id: Uuid, clear_path: bool) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE cv_documents
            SET status = $1,
                original_file_path = CASE WHEN $2 THEN NULL ELSE original_file_path END,
                updated_at = NOW()
            WHERE id = $3 AND status <> 'deleted'
            "#,
        )
        .bind(CvStatus::Deleted.as_str())
        .bind(clear_path)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_source(&self, source: SourceType) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cv_documents WHERE source_type = $1 AND status <> 'deleted'",
        )
        .bind(source.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::matching::similarity::rank_hits;

    /// Same measure as pgvector's `1 - (a <=> b)`.
    pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let (mut dot, mut na, mut nb) = (0.0_f64, 0.0_f64, 0.0_f64);
        for (x, y) in a.iter().zip(b) {
            let (x, y) = (*x as f64, *y as f64);
            dot += x * y;
            na += x * x;
            nb += y * y;
        }
        if na == 0.0 || nb == 0.0 {
            return 0.0;
        }
        dot / (na.sqrt() * nb.sqrt())
    }

    /// In-memory store with the same visibility rules as [`PgCvStore`].
    #[derive(Default)]
    pub(crate) struct MemoryCvStore {
        pub records: Mutex<Vec<CvRecord>>,
        pub fail_inserts: bool,
        /// Inserts whose `original_filename` is listed here fail.
        pub fail_filenames: Vec<String>,
    }

    impl MemoryCvStore {
        fn visible(&self) -> Vec<CvRecord> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.status != CvStatus::Deleted)
                .cloned()
                .collect()
        }

        pub(crate) fn raw(&self, id: Uuid) -> Option<CvRecord> {
            self.records.lock().unwrap().iter().find(|r| r.id == id).cloned()
        }
    }

    #[async_trait]
    impl CvStore for MemoryCvStore {
        async fn insert(&self, record: &CvRecord) -> Result<(), AppError> {
            if self.fail_inserts || self.fail_filenames.contains(&record.original_filename) {
                return Err(AppError::Database(sqlx::Error::PoolClosed));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn get(&self, id: Uuid) -> Result<Option<CvRecord>, AppError> {
            Ok(self.visible().into_iter().find(|r| r.id == id))
        }

        async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<CvRecord>, AppError> {
            Ok(self
                .visible()
                .into_iter()
                .filter(|r| ids.contains(&r.id))
                .collect())
        }

        async fn list(&self, offset: i64, limit: i64) -> Result<CvPage, AppError> {
            let mut all = self.visible();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
            let total = all.len() as i64;
            let records = all
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .collect();
            Ok(CvPage { records, total })
        }

        async fn nearest(
            &self,
            query: &[f32],
            threshold: f64,
            limit: i64,
        ) -> Result<Vec<SimilarityHit>, AppError> {
            let hits = self
                .visible()
                .into_iter()
                .map(|r| SimilarityHit {
                    id: r.id,
                    similarity: cosine_similarity(query, &r.embedding),
                    created_at: r.created_at,
                })
                .collect();
            Ok(rank_hits(hits, threshold, limit.max(0) as usize))
        }

        async fn mark_deleted(&self, id: Uuid, clear_path: bool) -> Result<bool, AppError> {
            let mut records = self.records.lock().unwrap();
            match records
                .iter_mut()
                .find(|r| r.id == id && r.status != CvStatus::Deleted)
            {
                Some(record) => {
                    record.status = CvStatus::Deleted;
                    if clear_path {
                        record.original_file_path = None;
                    }
                    record.updated_at = Utc::now();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn count_by_source(&self, source: SourceType) -> Result<i64, AppError> {
            Ok(self
                .visible()
                .iter()
                .filter(|r| r.source_type == source)
                .count() as i64)
        }
    }

    use crate::models::cv::tests::record_with;
    use crate::structuring::models::StructuredRecord;

    #[test]
    fn test_cosine_similarity_known_values() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]) - 0.70710678).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_nearest_ranks_by_similarity_above_threshold() {
        let store = MemoryCvStore::default();
        let mut fixtures = Vec::new();
        // cos = 0.9, 0.5, 0.2 against the query [1, 0]
        for cos in [0.9_f32, 0.5, 0.2] {
            let mut record = record_with(StructuredRecord::empty(), 0.0, 0);
            record.embedding = vec![cos, (1.0 - cos * cos).sqrt()];
            store.insert(&record).await.unwrap();
            fixtures.push(record.id);
        }

        let hits = store.nearest(&[1.0, 0.0], 0.3, 10).await.unwrap();

        let ids: Vec<Uuid> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![fixtures[0], fixtures[1]]);
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn test_deleted_records_are_invisible() {
        let store = MemoryCvStore::default();
        let record = record_with(StructuredRecord::empty(), 0.0, 0);
        store.insert(&record).await.unwrap();

        assert!(store.mark_deleted(record.id, true).await.unwrap());
        assert!(store.get(record.id).await.unwrap().is_none());
        assert_eq!(store.list(0, 10).await.unwrap().total, 0);
        assert!(!store.mark_deleted(record.id, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryCvStore::default();
        let old = record_with(StructuredRecord::empty(), 0.0, 100);
        let new = record_with(StructuredRecord::empty(), 0.0, 1);
        store.insert(&old).await.unwrap();
        store.insert(&new).await.unwrap();

        let page = store.list(0, 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.records[0].id, new.id);
    }
}
