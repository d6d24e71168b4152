//! Hosted sentence-embedding model behind an OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbedError, EmbeddingModel};
use crate::config::EmbeddingConfig;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct HttpEmbeddingModel {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddingModel {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let base_url = config
            .api_url
            .as_deref()
            .ok_or_else(|| EmbedError::Unavailable("EMBEDDING_API_URL not set".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingModel for HttpEmbeddingModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbedError::Empty)?;
        debug!(dimension = vector.len(), "Encoded text with {}", self.model);
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_is_unavailable() {
        let result = HttpEmbeddingModel::from_config(&EmbeddingConfig::default());
        assert!(matches!(result, Err(EmbedError::Unavailable(_))));
    }

    #[test]
    fn test_endpoint_is_built_from_base_url() {
        let config = EmbeddingConfig {
            api_url: Some("http://embed.local/v1/".to_string()),
            ..EmbeddingConfig::default()
        };
        let model = HttpEmbeddingModel::from_config(&config).unwrap();
        assert_eq!(model.endpoint, "http://embed.local/v1/embeddings");
        assert_eq!(model.model_name(), "sentence-transformers/all-MiniLM-L6-v2");
    }
}
