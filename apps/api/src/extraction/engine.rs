//! Hosted document-conversion engine (primary extractor).
//!
//! Protocol: multipart POST with a single `file` part; the engine answers
//! `{"text": ..., "pages": n, "tables": n}` or a non-2xx status when it
//! cannot handle the document.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{EngineOutput, ExtractError, ExtractionEngine, ExtractionMetadata};

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default, alias = "markdown")]
    text: String,
    #[serde(default)]
    pages: Option<u32>,
    #[serde(default)]
    tables: Option<u32>,
}

pub struct HostedEngine {
    client: Client,
    endpoint: String,
}

impl HostedEngine {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ExtractionEngine for HostedEngine {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<EngineOutput, ExtractError> {
        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        let form = Form::new().part("file", part);

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Unsupported(format!("engine returned {status}: {body}")));
        }

        let parsed: ConvertResponse = response.json().await?;
        debug!(
            filename,
            pages = ?parsed.pages,
            tables = ?parsed.tables,
            "Hosted engine converted document"
        );

        Ok(EngineOutput {
            text: parsed.text,
            metadata: ExtractionMetadata {
                pages: parsed.pages,
                tables: parsed.tables,
            },
        })
    }
}
