//! Open-schema structured record produced by the structuring stage.
//!
//! Candidate info and section content are string-keyed value stores with
//! typed accessors for the conventional keys; unknown keys round-trip untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::cv::normalize::normalize;

/// Truthiness with blank strings treated as empty: null, false, 0, [], {}
/// and strings that are empty or whitespace-only count as absent.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Candidate info
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateInfo(pub Map<String, Value>);

impl CandidateInfo {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// True when the key exists and carries a non-empty value.
    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_present)
    }

    pub fn full_name(&self) -> Option<&str> {
        self.get_str("full_name")
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    pub fn phone(&self) -> Option<&str> {
        self.get_str("phone")
    }

    pub fn location(&self) -> Option<&str> {
        self.get_str("location")
    }

    pub fn summary(&self) -> Option<&str> {
        self.get_str("summary")
    }

    pub fn linkedin_url(&self) -> Option<&str> {
        self.get_str("linkedin_url")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// Canonical section tag. Locale spellings collapse onto the same tag;
/// matching is case-sensitive against a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Experience,
    Education,
    Skills,
    Other,
}

impl SectionKind {
    pub fn from_section_type(section_type: &str) -> Self {
        match section_type {
            "experience" => SectionKind::Experience,
            "formation" | "education" => SectionKind::Education,
            "compétences" | "skills" => SectionKind::Skills,
            _ => SectionKind::Other,
        }
    }

    /// The list-valued content field aggregated for this kind, if any.
    pub fn content_key(self) -> Option<&'static str> {
        match self {
            SectionKind::Experience => Some("experiences"),
            SectionKind::Education => Some("education"),
            SectionKind::Skills => Some("skills"),
            SectionKind::Other => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionContent(pub Map<String, Value>);

impl SectionContent {
    /// The array stored under `key`; missing or non-array values yield an empty slice.
    pub fn list(&self, key: &str) -> &[Value] {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredSection {
    #[serde(default = "other_section_type", deserialize_with = "lenient_section_type")]
    pub section_type: String,
    #[serde(
        rename = "section_title",
        alias = "title",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_content")]
    pub content: SectionContent,
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: i64,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StructuredSection {
    pub fn new(section_type: &str, order: i64, content: Value) -> Self {
        let content = match content {
            Value::Object(map) => SectionContent(map),
            _ => SectionContent::default(),
        };
        Self {
            section_type: section_type.to_string(),
            title: None,
            content,
            order,
            confidence: 0.0,
            extra: Map::new(),
        }
    }

    pub fn kind(&self) -> SectionKind {
        SectionKind::from_section_type(&self.section_type)
    }
}

fn other_section_type() -> String {
    "other".to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Career summary
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerSummary {
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub years_of_experience: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub seniority_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub primary_expertise: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ────────────────────────────────────────────────────────────────────────────
// Structured record
// ────────────────────────────────────────────────────────────────────────────

/// Candidate record. `experiences`, `education` and `skills` are always the
/// normalized view of `sections`; build through [`StructuredRecord::from_parts`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    #[serde(default)]
    pub candidate_info: CandidateInfo,
    #[serde(default)]
    pub sections: Vec<StructuredSection>,
    #[serde(default)]
    pub experiences: Vec<Value>,
    #[serde(default)]
    pub education: Vec<Value>,
    #[serde(default)]
    pub skills: Vec<Value>,
    #[serde(default)]
    pub career_summary: CareerSummary,
}

impl StructuredRecord {
    pub fn from_parts(
        candidate_info: CandidateInfo,
        sections: Vec<StructuredSection>,
        career_summary: CareerSummary,
    ) -> Self {
        let buckets = normalize(&sections);
        Self {
            candidate_info,
            sections,
            experiences: buckets.experiences,
            education: buckets.education,
            skills: buckets.skills,
            career_summary,
        }
    }

    /// The zero-signal record used when structuring is unavailable.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Shape of the model's JSON answer. Every field is optional and tolerant of
/// wrong types so that a partially valid answer still yields a record; the
/// answer itself must be a JSON object (see [`LlmStructuredPayload::from_answer`]).
#[derive(Debug, Default, Deserialize)]
pub struct LlmStructuredPayload {
    #[serde(default, deserialize_with = "lenient_candidate_info")]
    pub candidate_info: CandidateInfo,
    #[serde(default, deserialize_with = "lenient_sections")]
    pub sections: Vec<StructuredSection>,
    #[serde(default, deserialize_with = "lenient_career_summary")]
    pub career_summary: CareerSummary,
}

impl LlmStructuredPayload {
    /// Accepts only an object. serde's derived visitor would also take a JSON
    /// array positionally, which is never a usable answer.
    pub fn from_answer(answer: Value) -> Result<Self, String> {
        match answer {
            Value::Object(_) => serde_json::from_value(answer).map_err(|e| e.to_string()),
            Value::Array(_) => Err("non-object response (array)".to_string()),
            other => Err(format!("non-object response ({})", value_kind(&other))),
        }
    }

    pub fn into_record(self) -> StructuredRecord {
        StructuredRecord::from_parts(self.candidate_info, self.sections, self.career_summary)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient deserializers
// ────────────────────────────────────────────────────────────────────────────

fn lenient_candidate_info<'de, D: Deserializer<'de>>(d: D) -> Result<CandidateInfo, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => CandidateInfo(map),
        _ => CandidateInfo::default(),
    })
}

fn lenient_content<'de, D: Deserializer<'de>>(d: D) -> Result<SectionContent, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => SectionContent(map),
        _ => SectionContent::default(),
    })
}

fn lenient_section_type<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.trim().is_empty() => s,
        _ => other_section_type(),
    })
}

fn lenient_sections<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Vec<StructuredSection>, D::Error> {
    let sections = match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };
    Ok(sections)
}

fn lenient_career_summary<'de, D: Deserializer<'de>>(d: D) -> Result<CareerSummary, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_order<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(value_as_f64(&Value::deserialize(d)?)
        .map(|f| f as i64)
        .unwrap_or(0))
}

fn lenient_confidence<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(value_as_f64(&Value::deserialize(d)?)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0))
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(value_as_f64(&Value::deserialize(d)?))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Numbers pass through; strings like "5+" or "7 years" yield their leading number.
fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}
