//! Flattens heterogeneous sections into the canonical experience, education
//! and skill collections.

use serde_json::Value;

use crate::structuring::models::{SectionKind, StructuredSection};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBuckets {
    pub experiences: Vec<Value>,
    pub education: Vec<Value>,
    pub skills: Vec<Value>,
}

/// Concatenates each matching section's list field in section order.
/// Sections of other kinds stay only in `sections`.
pub fn normalize(sections: &[StructuredSection]) -> NormalizedBuckets {
    let mut buckets = NormalizedBuckets::default();

    for section in sections {
        let kind = section.kind();
        let Some(key) = kind.content_key() else {
            continue;
        };
        let items = section.content.list(key);
        let bucket = match kind {
            SectionKind::Experience => &mut buckets.experiences,
            SectionKind::Education => &mut buckets.education,
            SectionKind::Skills => &mut buckets.skills,
            SectionKind::Other => continue,
        };
        bucket.extend(items.iter().cloned());
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structuring::models::{CandidateInfo, CareerSummary, StructuredRecord};
    use serde_json::json;

    fn fixture_sections() -> Vec<StructuredSection> {
        vec![
            StructuredSection::new(
                "experience",
                1,
                json!({"experiences": [{"job_title": "Engineer", "company": "Acme"}]}),
            ),
            StructuredSection::new(
                "formation",
                2,
                json!({"education": [{"degree": "Master Informatique"}]}),
            ),
            StructuredSection::new("compétences", 3, json!({"skills": ["Java", "Spring"]})),
            StructuredSection::new("projets", 4, json!({"projects": [{"name": "ATS"}]})),
            StructuredSection::new(
                "experience",
                7,
                json!({"experiences": [{"job_title": "Developer", "company": "TechStart"}]}),
            ),
            StructuredSection::new("education", 8, json!({"education": [{"degree": "BSc"}]})),
            StructuredSection::new("skills", 9, json!({"skills": ["Python"]})),
        ]
    }

    #[test]
    fn test_dispatch_concatenates_in_section_order() {
        let buckets = normalize(&fixture_sections());
        assert_eq!(
            buckets.experiences,
            vec![
                json!({"job_title": "Engineer", "company": "Acme"}),
                json!({"job_title": "Developer", "company": "TechStart"}),
            ]
        );
        assert_eq!(
            buckets.education,
            vec![json!({"degree": "Master Informatique"}), json!({"degree": "BSc"})]
        );
        assert_eq!(buckets.skills, vec![json!("Java"), json!("Spring"), json!("Python")]);
    }

    #[test]
    fn test_unknown_types_are_not_aggregated() {
        let sections = vec![
            StructuredSection::new("projets", 1, json!({"experiences": [{"x": 1}]})),
            StructuredSection::new("Skills", 2, json!({"skills": ["Rust"]})),
        ];
        assert_eq!(normalize(&sections), NormalizedBuckets::default());
    }

    #[test]
    fn test_wrong_field_or_non_list_contributes_nothing() {
        let sections = vec![
            StructuredSection::new("experience", 1, json!({"jobs": [{"x": 1}]})),
            StructuredSection::new("skills", 2, json!({"skills": "Python, Go"})),
        ];
        assert_eq!(normalize(&sections), NormalizedBuckets::default());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let sections = fixture_sections();
        assert_eq!(normalize(&sections), normalize(&sections));
    }

    #[test]
    fn test_round_trip_matches_hand_built_fixture() {
        let sections = fixture_sections();
        let record = StructuredRecord::from_parts(
            CandidateInfo::default(),
            sections.clone(),
            CareerSummary::default(),
        );

        let expected_experiences = json!([
            {"job_title": "Engineer", "company": "Acme"},
            {"job_title": "Developer", "company": "TechStart"}
        ]);
        let expected_education = json!([{"degree": "Master Informatique"}, {"degree": "BSc"}]);
        let expected_skills = json!(["Java", "Spring", "Python"]);

        assert_eq!(
            serde_json::to_vec(&record.experiences).unwrap(),
            serde_json::to_vec(&expected_experiences).unwrap()
        );
        assert_eq!(
            serde_json::to_vec(&record.education).unwrap(),
            serde_json::to_vec(&expected_education).unwrap()
        );
        assert_eq!(
            serde_json::to_vec(&record.skills).unwrap(),
            serde_json::to_vec(&expected_skills).unwrap()
        );
        assert_eq!(record.sections, sections);
    }

    #[test]
    fn test_empty_sections_yield_empty_buckets() {
        assert_eq!(normalize(&[]), NormalizedBuckets::default());
    }
}
