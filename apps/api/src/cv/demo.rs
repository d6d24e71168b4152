//! Built-in demo résumés, loaded through the text pipeline with simulated extraction.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::cv::ingest::{ingest_text, DocumentMeta, Pipeline};
use crate::cv::store::CvStore;
use crate::errors::AppError;
use crate::models::cv::{CvRecord, SourceType};

/// Clean, noisy-scan, messy and bilingual layouts.
pub const DEMO_CV_TEXTS: [&str; 4] = [
    "John Doe
Senior Software Engineer
Email: john.doe@email.com | Phone: +1 555-123-4567 | Location: San Francisco, CA
LinkedIn: linkedin.com/in/johndoe

PROFESSIONAL SUMMARY
5+ years of experience in full-stack development. Expertise in React, Node.js, and Python.
Led teams of 5+ developers. Strong problem-solving and communication skills.

EXPERIENCE
Senior Software Engineer | TechCorp Inc. | 2020 - Present
- Developed microservices using Python and FastAPI
- Led migration to Kubernetes
- Mentored 3 junior developers

Software Developer | StartUpXYZ | 2018 - 2020
- Built React frontend applications
- Implemented CI/CD with Jenkins

EDUCATION
B.S. Computer Science | MIT | 2018

SKILLS
Python, JavaScript, React, Node.js, PostgreSQL, Docker, AWS",
    "Marie Dupont
   INGENIEURE LOGICIEL
   marie.dupont@mail.fr  |  Paris, France

   EXPERIENCE
   2021-2024  Ingenieure Senior  |  EntrepriseSoft
   Developpement applications Java Spring
   Gestion equipe de 4 personnes

   2018-2021  Developpeuse  |  TechStart
   Backend PHP et MySQL

   FORMATION
   Master Informatique  |  Universite Paris-Saclay  |  2018

   COMPETENCES
   Java, Spring, Python, SQL, Git, Agile",
    "Alex Smith - alex.smith@mail.com - NYC
    FULL STACK DEV
    skills: react node python sql
    work:
    - 2022-now: Dev at BigCo (react, api)
    - 2020-2022: Junior at SmallCo
    edu: CS degree 2020",
    "Carlos García
    Desarrollador Full Stack | Full Stack Developer
    carlos@email.com | Madrid, Spain | Español, English (fluent)

    RÉSUMÉ | SUMMARY
    4 ans d'expérience en développement web. Experience with React, Vue, and Django.
    Passionné par l'architecture cloud. Passionate about cloud architecture.

    EXPÉRIENCE | EXPERIENCE
    Full Stack Developer | IberiaTech | 2021 - Present
    - Desarrollo de APIs REST con Django | REST API development with Django
    - Frontend con Vue.js y React

    EDUCATION | FORMACIÓN
    Ingeniería Informática | Universidad Complutense | 2020

    COMPETENCIAS | SKILLS
    Python, JavaScript, Vue, React, Django, PostgreSQL, AWS",
];

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStep {
    pub name: &'static str,
    pub status: &'static str,
    #[serde(flatten)]
    pub detail: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoStepLog {
    pub cv_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_id: Option<Uuid>,
    pub steps: Vec<PipelineStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoLoadReport {
    pub message: String,
    pub cv_ids: Vec<Uuid>,
    pub steps: Vec<DemoStepLog>,
    pub total: usize,
}

/// Processes every demo text in order. A failing document is logged and
/// reported in its step log; the rest of the batch still runs.
pub async fn load_demo_data(pipeline: &Pipeline, store: &dyn CvStore) -> DemoLoadReport {
    load_texts(pipeline, store, &DEMO_CV_TEXTS).await
}

async fn load_texts(pipeline: &Pipeline, store: &dyn CvStore, texts: &[&str]) -> DemoLoadReport {
    let mut cv_ids = Vec::new();
    let mut steps = Vec::new();

    for (i, text) in texts.iter().enumerate() {
        let meta = DocumentMeta {
            filename: format!("demo_cv_{}.pdf", i + 1),
            mime_type: "application/pdf".to_string(),
            file_size_bytes: text.len() as i64,
            source: SourceType::Demo,
            gdpr_consent: true,
        };

        match ingest_text(pipeline, store, text, meta).await {
            Ok(record) => {
                cv_ids.push(record.id);
                steps.push(DemoStepLog {
                    cv_index: i + 1,
                    cv_id: Some(record.id),
                    steps: record_steps(&record),
                    error: None,
                });
            }
            Err(e) => {
                error!(cv_index = i + 1, "Demo CV failed to load: {e}");
                steps.push(DemoStepLog {
                    cv_index: i + 1,
                    cv_id: None,
                    steps: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    info!(loaded = cv_ids.len(), attempted = texts.len(), "Demo data loaded");
    DemoLoadReport {
        message: "Demo data loaded".to_string(),
        total: cv_ids.len(),
        cv_ids,
        steps,
    }
}

fn record_steps(record: &CvRecord) -> Vec<PipelineStep> {
    vec![
        PipelineStep {
            name: "OCR",
            status: "completed",
            detail: json!({ "note": "Text input", "confidence": record.extraction_confidence }),
        },
        PipelineStep {
            name: "LLM",
            status: if record.llm_structured { "completed" } else { "partial" },
            detail: json!({ "note": record.llm_model.as_deref().unwrap_or("unavailable") }),
        },
        PipelineStep {
            name: "Embedding",
            status: "completed",
            detail: json!({ "dim": record.embedding.len() }),
        },
    ]
}

pub async fn demo_count(store: &dyn CvStore) -> Result<i64, AppError> {
    store.count_by_source(SourceType::Demo).await
}
