//! Multi-criteria scoring: a weighted linear combination of signal counts and
//! the stored quality score.
//!
//! Algorithm, per record:
//! - skills component     = min(len(skills) / 10, 1) × w.skills
//! - experience component = min(len(experiences) / 5, 1) × w.experience
//! - education component  = min(len(education) / 3, 1) × w.education
//! - quality component    = quality_score × w.quality
//!
//! The total is capped at 1.0 and rounded to two decimals. Weights are not
//! normalized, so a weight set summing above 1.0 saturates at the cap.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::cv::CvRecord;
use crate::structuring::models::CandidateInfo;

const SKILLS_CAP: f64 = 10.0;
const EXPERIENCE_CAP: f64 = 5.0;
const EDUCATION_CAP: f64 = 3.0;

/// Caller-supplied weights. Each missing key falls back to its default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub quality: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skills: 0.4,
            experience: 0.3,
            education: 0.2,
            quality: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub quality: f64,
}

/// Contact fields shown next to a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateCard {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub summary: Option<String>,
}

impl CandidateCard {
    pub fn from_info(info: &CandidateInfo) -> Self {
        let owned = |v: Option<&str>| v.map(str::to_string);
        Self {
            full_name: owned(info.full_name()),
            email: owned(info.email()),
            phone: owned(info.phone()),
            location: owned(info.location()),
            linkedin_url: owned(info.linkedin_url()),
            summary: owned(info.summary()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub cv_id: Uuid,
    pub candidate: CandidateCard,
    #[serde(rename = "score")]
    pub total_score: f64,
    pub breakdown: ScoreBreakdown,
    #[serde(skip)]
    created_at: DateTime<Utc>,
}

/// Scores one record. Counts come from the normalized buckets.
pub fn score_record(record: &CvRecord, weights: &ScoringWeights) -> CandidateScore {
    let data = &record.structured_data;
    let skills = ratio(data.skills.len(), SKILLS_CAP) * weights.skills;
    let experience = ratio(data.experiences.len(), EXPERIENCE_CAP) * weights.experience;
    let education = ratio(data.education.len(), EDUCATION_CAP) * weights.education;
    let quality = record.quality_score * weights.quality;

    let total = (skills + experience + education + quality).min(1.0);

    CandidateScore {
        cv_id: record.id,
        candidate: CandidateCard::from_info(&data.candidate_info),
        total_score: round2(total),
        breakdown: ScoreBreakdown {
            skills: round2(skills),
            experience: round2(experience),
            education: round2(education),
            quality: round2(quality),
        },
        created_at: record.created_at,
    }
}

/// Scores and ranks records, best first. Ties: oldest record first, then id.
pub fn score_candidates(records: &[CvRecord], weights: &ScoringWeights) -> Vec<CandidateScore> {
    let mut scores: Vec<CandidateScore> =
        records.iter().map(|r| score_record(r, weights)).collect();
    scores.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.cv_id.cmp(&b.cv_id))
    });
    scores
}

fn ratio(count: usize, cap: f64) -> f64 {
    (count as f64 / cap).min(1.0)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
