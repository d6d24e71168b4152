use std::str::FromStr;

use anyhow::{ensure, Context, Result};

/// Content types accepted by the ingestion endpoint.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Application configuration loaded from environment variables.
///
/// Persistence and blob storage settings are required; the LLM, extraction
/// engine and embedding model are optional and the pipeline degrades without them.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub embedding: EmbeddingConfig,
    pub max_file_size_mb: usize,
    pub signed_url_expiry_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `None` means structuring runs in degraded mode.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.1,
            max_tokens: 4000,
            timeout_secs: 90,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub engine_url: Option<String>,
    pub timeout_secs: u64,
    pub tesseract_bin: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            engine_url: None,
            timeout_secs: 120,
            tesseract_bin: "tesseract".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm_defaults = LlmConfig::default();
        let extraction_defaults = ExtractionConfig::default();
        let embedding_defaults = EmbeddingConfig::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            llm: LlmConfig {
                api_key: optional_env("LLM_API_KEY"),
                api_url: optional_env("LLM_API_URL").unwrap_or(llm_defaults.api_url),
                model: optional_env("LLM_MODEL").unwrap_or(llm_defaults.model),
                temperature: parse_env("LLM_TEMPERATURE", llm_defaults.temperature)?,
                max_tokens: parse_env("LLM_MAX_TOKENS", llm_defaults.max_tokens)?,
                timeout_secs: parse_env("LLM_TIMEOUT_SECS", llm_defaults.timeout_secs)?,
            },
            extraction: ExtractionConfig {
                engine_url: optional_env("EXTRACTION_ENGINE_URL"),
                timeout_secs: parse_env(
                    "EXTRACTION_TIMEOUT_SECS",
                    extraction_defaults.timeout_secs,
                )?,
                tesseract_bin: optional_env("TESSERACT_BIN")
                    .unwrap_or(extraction_defaults.tesseract_bin),
            },
            embedding: EmbeddingConfig {
                api_url: optional_env("EMBEDDING_API_URL"),
                api_key: optional_env("EMBEDDING_API_KEY"),
                model: optional_env("EMBEDDING_MODEL").unwrap_or(embedding_defaults.model),
                dimension: stored_dimension(parse_env(
                    "EMBEDDING_DIMENSION",
                    embedding_defaults.dimension,
                )?)?,
                timeout_secs: parse_env(
                    "EMBEDDING_TIMEOUT_SECS",
                    embedding_defaults.timeout_secs,
                )?,
            },
            max_file_size_mb: parse_env("MAX_FILE_SIZE_MB", 10)?,
            signed_url_expiry_secs: parse_env("SIGNED_URL_EXPIRY", 3600)?,
            port: parse_env("PORT", 8000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type)
}

/// Width of the `embedding` column in `migrations/0001_cv_documents.sql`.
pub const STORED_EMBEDDING_DIMENSION: usize = 384;

fn stored_dimension(dimension: usize) -> Result<usize> {
    ensure!(
        dimension == STORED_EMBEDDING_DIMENSION,
        "EMBEDDING_DIMENSION is {dimension} but the cv_documents.embedding column is vector({STORED_EMBEDDING_DIMENSION})"
    );
    Ok(dimension)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Empty values count as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_accepts_pdf_and_docx() {
        assert!(is_allowed_content_type("application/pdf"));
        assert!(is_allowed_content_type(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
    }

    #[test]
    fn test_allow_list_rejects_other_types() {
        assert!(!is_allowed_content_type("text/plain"));
        assert!(!is_allowed_content_type("image/gif"));
        assert!(!is_allowed_content_type("APPLICATION/PDF"));
    }

    #[test]
    fn test_defaults_match_reference_deployment() {
        assert_eq!(EmbeddingConfig::default().dimension, 384);
        assert_eq!(LlmConfig::default().timeout_secs, 90);
        assert!(LlmConfig::default().api_key.is_none());
    }

    #[test]
    fn test_embedding_dimension_must_match_column() {
        assert_eq!(stored_dimension(384).unwrap(), 384);
        let err = stored_dimension(768).unwrap_err();
        assert!(err.to_string().contains("vector(384)"));
    }
}
