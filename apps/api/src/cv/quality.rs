use crate::structuring::models::StructuredRecord;

const FULL_NAME_WEIGHT: f64 = 0.3;
const EMAIL_WEIGHT: f64 = 0.2;
const EXPERIENCE_WEIGHT: f64 = 0.3;
const SKILLS_WEIGHT: f64 = 0.2;

/// Completeness heuristic in [0, 1] computed from candidate info and the
/// normalized buckets (never from raw sections).
pub fn quality_score(record: &StructuredRecord) -> f64 {
    let mut score = 0.0;
    if record.candidate_info.has("full_name") {
        score += FULL_NAME_WEIGHT;
    }
    if record.candidate_info.has("email") {
        score += EMAIL_WEIGHT;
    }
    if !record.experiences.is_empty() {
        score += EXPERIENCE_WEIGHT;
    }
    if !record.skills.is_empty() {
        score += SKILLS_WEIGHT;
    }
    score.min(1.0)
}
