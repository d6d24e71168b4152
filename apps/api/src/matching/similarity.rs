//! Similarity ranking over stored embeddings.
//!
//! The record store answers nearest-neighbour queries; this module owns the
//! ordering contract: strictly above threshold, descending by similarity,
//! ties broken by creation time (oldest first) then id.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::cv::CvRecord;

/// Threshold used by `GET /api/cv/search`.
pub const SEARCH_THRESHOLD: f64 = 0.5;

/// Threshold used by `POST /api/matching/semantic`.
pub const MATCHING_THRESHOLD: f64 = 0.3;

/// One `(id, similarity)` pair as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    pub id: Uuid,
    pub similarity: f64,
    pub created_at: DateTime<Utc>,
}

/// A record carried together with the similarity that ranked it.
#[derive(Debug, Clone, Serialize)]
pub struct RankedRecord {
    #[serde(flatten)]
    pub record: CvRecord,
    pub similarity: f64,
}

/// True when the vector carries no signal; such a query cannot rank anything.
pub fn is_zero_vector(v: &[f32]) -> bool {
    v.iter().all(|&x| x == 0.0)
}

/// Keeps hits strictly above `threshold`, orders them and caps at `limit`.
pub fn rank_hits(mut hits: Vec<SimilarityHit>, threshold: f64, limit: usize) -> Vec<SimilarityHit> {
    hits.retain(|h| h.similarity > threshold);
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(limit);
    hits
}

/// Joins ranked hits with their records, preserving hit order and similarity.
/// Hits whose record is missing (e.g. deleted in between) are dropped.
pub fn join_ranked(hits: &[SimilarityHit], records: Vec<CvRecord>) -> Vec<RankedRecord> {
    let mut by_id: HashMap<Uuid, CvRecord> = records.into_iter().map(|r| (r.id, r)).collect();
    hits.iter()
        .filter_map(|hit| {
            by_id.remove(&hit.id).map(|record| RankedRecord {
                record,
                similarity: hit.similarity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hit(similarity: f64, age_secs: i64) -> SimilarityHit {
        SimilarityHit {
            id: Uuid::new_v4(),
            similarity,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn test_threshold_keeps_two_of_three_in_order() {
        let hits = vec![hit(0.2, 0), hit(0.9, 0), hit(0.5, 0)];
        let ranked = rank_hits(hits, 0.3, 10);
        let sims: Vec<f64> = ranked.iter().map(|h| h.similarity).collect();
        assert_eq!(sims, vec![0.9, 0.5]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let ranked = rank_hits(vec![hit(0.3, 0), hit(0.31, 0)], 0.3, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].similarity, 0.31);
    }

    #[test]
    fn test_ties_break_by_creation_time() {
        let newer = hit(0.8, 10);
        let older = hit(0.8, 100);
        let ranked = rank_hits(vec![newer.clone(), older.clone()], 0.0, 10);
        assert_eq!(ranked[0].id, older.id);
        assert_eq!(ranked[1].id, newer.id);
    }

    #[test]
    fn test_limit_caps_results() {
        let hits = (0..5).map(|i| hit(0.9 - i as f64 * 0.1, 0)).collect();
        assert_eq!(rank_hits(hits, 0.0, 3).len(), 3);
    }

    #[test]
    fn test_join_keeps_similarity_and_order() {
        use crate::models::cv::tests::record_with;
        use crate::structuring::models::StructuredRecord;

        let a = record_with(StructuredRecord::empty(), 0.0, 0);
        let b = record_with(StructuredRecord::empty(), 0.0, 0);
        let hits = vec![
            SimilarityHit {
                id: b.id,
                similarity: 0.9,
                created_at: b.created_at,
            },
            SimilarityHit {
                id: Uuid::new_v4(),
                similarity: 0.8,
                created_at: Utc::now(),
            },
            SimilarityHit {
                id: a.id,
                similarity: 0.7,
                created_at: a.created_at,
            },
        ];
        let joined = join_ranked(&hits, vec![a.clone(), b.clone()]);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].record.id, b.id);
        assert_eq!(joined[0].similarity, 0.9);
        assert_eq!(joined[1].record.id, a.id);
        assert_eq!(joined[1].similarity, 0.7);
    }

    #[test]
    fn test_zero_vector_detection() {
        assert!(is_zero_vector(&[0.0; 4]));
        assert!(!is_zero_vector(&[0.0, 0.1]));
    }
}
