//! Converts raw document bytes into plain text.
//!
//! Tries the hosted primary engine first, then a mime-specific fallback
//! (PDF text layer or OCR), and finally settles on the `none` result. It never
//! returns an error: every failure path ends in [`ExtractionResult::none`].

pub mod engine;
pub mod ocr;
pub mod pdf;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ExtractionConfig;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("unsupported document type: {0}")]
    Unsupported(String),

    #[error("extraction failed: {0}")]
    Failed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// Which path produced the text. Confidence is a static property of the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    Primary,
    FallbackPdf,
    FallbackImage,
    None,
}

impl ExtractionMethod {
    pub fn confidence(self) -> f64 {
        match self {
            ExtractionMethod::Primary => 0.95,
            ExtractionMethod::FallbackPdf => 0.7,
            ExtractionMethod::FallbackImage => 0.6,
            ExtractionMethod::None => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::Primary => "primary",
            ExtractionMethod::FallbackPdf => "fallback-pdf",
            ExtractionMethod::FallbackImage => "fallback-image",
            ExtractionMethod::None => "none",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "primary" => ExtractionMethod::Primary,
            "fallback-pdf" => ExtractionMethod::FallbackPdf,
            "fallback-image" => ExtractionMethod::FallbackImage,
            _ => ExtractionMethod::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub pages: Option<u32>,
    pub tables: Option<u32>,
}

/// Text plus layout metadata as returned by one engine.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    pub text: String,
    pub metadata: ExtractionMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub confidence: f64,
    pub method: ExtractionMethod,
    pub success: bool,
    pub metadata: ExtractionMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// Blank text is not a success; callers fall through to the next engine.
    fn from_output(output: EngineOutput, method: ExtractionMethod) -> Option<Self> {
        if output.text.trim().is_empty() {
            return None;
        }
        Some(Self {
            text: output.text,
            confidence: method.confidence(),
            method,
            success: true,
            metadata: output.metadata,
            error: None,
        })
    }

    /// Text supplied directly instead of extracted, recorded at primary confidence.
    pub fn provided(text: &str) -> Self {
        Self::from_output(
            EngineOutput {
                text: text.to_string(),
                metadata: ExtractionMetadata::default(),
            },
            ExtractionMethod::Primary,
        )
        .unwrap_or_else(|| Self::none("Provided text is empty"))
    }

    pub fn none(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            method: ExtractionMethod::None,
            success: false,
            metadata: ExtractionMetadata::default(),
            error: Some(error.into()),
        }
    }
}

/// One extraction backend. Implementations report inapplicable documents as errors.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<EngineOutput, ExtractError>;
}

#[derive(Clone)]
pub struct Extractor {
    primary: Option<Arc<dyn ExtractionEngine>>,
    pdf: Arc<dyn ExtractionEngine>,
    ocr: Arc<dyn ExtractionEngine>,
}

impl Extractor {
    pub fn new(
        primary: Option<Arc<dyn ExtractionEngine>>,
        pdf: Arc<dyn ExtractionEngine>,
        ocr: Arc<dyn ExtractionEngine>,
    ) -> Self {
        Self { primary, pdf, ocr }
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let primary = match &config.engine_url {
            Some(url) => Some(Arc::new(engine::HostedEngine::new(url, config.timeout_secs)?)
                as Arc<dyn ExtractionEngine>),
            None => {
                warn!("EXTRACTION_ENGINE_URL not set - only fallback extractors are available");
                None
            }
        };
        Ok(Self::new(
            primary,
            Arc::new(pdf::PdfTextEngine),
            Arc::new(ocr::TesseractEngine::new(
                &config.tesseract_bin,
                config.timeout_secs,
            )),
        ))
    }

    pub async fn extract(&self, bytes: &[u8], filename: &str, mime_type: &str) -> ExtractionResult {
        if let Some(primary) = &self.primary {
            if let Some(result) =
                attempt(primary.as_ref(), ExtractionMethod::Primary, bytes, filename, mime_type)
                    .await
            {
                return result;
            }
        }

        let fallback = if mime_type == "application/pdf" {
            Some((&self.pdf, ExtractionMethod::FallbackPdf))
        } else if mime_type.starts_with("image/") {
            Some((&self.ocr, ExtractionMethod::FallbackImage))
        } else {
            None
        };

        if let Some((engine, method)) = fallback {
            if let Some(result) =
                attempt(engine.as_ref(), method, bytes, filename, mime_type).await
            {
                return result;
            }
        }

        warn!(filename, mime_type, "No extraction method produced text");
        ExtractionResult::none("No extraction method available")
    }
}

async fn attempt(
    engine: &dyn ExtractionEngine,
    method: ExtractionMethod,
    bytes: &[u8],
    filename: &str,
    mime_type: &str,
) -> Option<ExtractionResult> {
    match engine.extract(bytes, filename, mime_type).await {
        Ok(output) => {
            let result = ExtractionResult::from_output(output, method);
            match &result {
                Some(r) => info!(
                    filename,
                    engine = engine.name(),
                    chars = r.text.len(),
                    "Extracted document text"
                ),
                None => warn!(filename, engine = engine.name(), "Engine returned no text"),
            }
            result
        }
        Err(e) => {
            warn!(filename, engine = engine.name(), "Extraction attempt failed: {e}");
            None
        }
    }
}
