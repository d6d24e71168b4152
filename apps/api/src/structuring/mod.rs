//! Turns extracted plain text into a [`StructuredRecord`] via a
//! single prompt-driven completion call.
//!
//! Never fails: a missing credential or any call/parse failure yields
//! [`StructuringOutcome::Degraded`] carrying the empty record.

pub mod models;
pub mod prompts;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::extraction::ExtractionMetadata;
use crate::llm_client::LlmClient;
use models::{LlmStructuredPayload, StructuredRecord};
use prompts::{build_structure_prompt, structuring_system_prompt};

/// Source text beyond this many characters is not sent to the model.
pub const MAX_PROMPT_CHARS: usize = 8000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DegradeReason {
    NotConfigured,
    CallFailed(String),
}

impl std::fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradeReason::NotConfigured => write!(f, "LLM not available"),
            DegradeReason::CallFailed(msg) => write!(f, "{msg}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StructuringOutcome {
    Structured {
        record: StructuredRecord,
        confidence: f64,
        model: String,
    },
    Degraded {
        record: StructuredRecord,
        reason: DegradeReason,
    },
}

impl StructuringOutcome {
    fn degraded(reason: DegradeReason) -> Self {
        StructuringOutcome::Degraded {
            record: StructuredRecord::empty(),
            reason,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, StructuringOutcome::Structured { .. })
    }

    pub fn record(&self) -> &StructuredRecord {
        match self {
            StructuringOutcome::Structured { record, .. }
            | StructuringOutcome::Degraded { record, .. } => record,
        }
    }

    pub fn into_record(self) -> StructuredRecord {
        match self {
            StructuringOutcome::Structured { record, .. }
            | StructuringOutcome::Degraded { record, .. } => record,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            StructuringOutcome::Structured { confidence, .. } => *confidence,
            StructuringOutcome::Degraded { .. } => 0.0,
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            StructuringOutcome::Structured { model, .. } => Some(model),
            StructuringOutcome::Degraded { .. } => None,
        }
    }

    pub fn error(&self) -> Option<String> {
        match self {
            StructuringOutcome::Structured { .. } => None,
            StructuringOutcome::Degraded { reason, .. } => Some(reason.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct Structurer {
    llm: Option<LlmClient>,
}

impl Structurer {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn structure(&self, text: &str, metadata: &ExtractionMetadata) -> StructuringOutcome {
        let Some(llm) = &self.llm else {
            warn!("LLM_API_KEY not set - structuring degraded to empty record");
            return StructuringOutcome::degraded(DegradeReason::NotConfigured);
        };

        let prompt = build_structure_prompt(truncate_chars(text, MAX_PROMPT_CHARS));
        info!(
            chars = text.chars().count(),
            pages = ?metadata.pages,
            tables = ?metadata.tables,
            "Structuring CV text with {}",
            llm.model()
        );

        match llm
            .call_json::<Value>(&prompt, &structuring_system_prompt())
            .await
        {
            Ok(answer) => outcome_from_answer(answer, llm.model()),
            Err(e) => {
                warn!("LLM structuring failed, using empty record: {e}");
                StructuringOutcome::degraded(DegradeReason::CallFailed(e.to_string()))
            }
        }
    }
}

/// Turns the model's parsed JSON answer into an outcome. Anything but an
/// object degrades.
pub fn outcome_from_answer(answer: Value, model: &str) -> StructuringOutcome {
    match LlmStructuredPayload::from_answer(answer) {
        Ok(payload) => {
            let record = payload.into_record();
            let confidence = structuring_confidence(&record);
            StructuringOutcome::Structured {
                record,
                confidence,
                model: model.to_string(),
            }
        }
        Err(reason) => {
            warn!("LLM structuring answer unusable, using empty record: {reason}");
            StructuringOutcome::degraded(DegradeReason::CallFailed(reason))
        }
    }
}

/// Mean of the name signal (1.0 present / 0.3 absent) and `min(sections / 5, 1)`.
pub fn structuring_confidence(record: &StructuredRecord) -> f64 {
    let name_signal = if record.candidate_info.has("full_name") {
        1.0
    } else {
        0.3
    };
    let section_signal = (record.sections.len() as f64 / 5.0).min(1.0);
    (name_signal + section_signal) / 2.0
}

/// Longest prefix of at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
