//! Fixed-dimensionality sentence vectors for semantic retrieval.
//!
//! The model handle is acquired lazily, once per process, behind a
//! `tokio::sync::OnceCell`. Every path returns exactly `dimension` floats:
//! when the model is unavailable, the text is empty, or encoding fails, the
//! result is an explicit zero-filled vector.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::EmbeddingConfig;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned no embedding")]
    Empty,
}

#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroFillReason {
    EmptyText,
    ModelUnavailable,
    EncodeFailed(String),
    DimensionMismatch { expected: usize, actual: usize },
}

/// Output of the embedding stage; degraded vectors say why they are zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    Encoded(Vec<f32>),
    ZeroFilled {
        vector: Vec<f32>,
        reason: ZeroFillReason,
    },
}

impl Embedding {
    fn zero(dimension: usize, reason: ZeroFillReason) -> Self {
        Embedding::ZeroFilled {
            vector: vec![0.0; dimension],
            reason,
        }
    }

    pub fn vector(&self) -> &[f32] {
        match self {
            Embedding::Encoded(v) | Embedding::ZeroFilled { vector: v, .. } => v,
        }
    }

    pub fn into_vector(self) -> Vec<f32> {
        match self {
            Embedding::Encoded(v) | Embedding::ZeroFilled { vector: v, .. } => v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Embedding::ZeroFilled { .. })
    }
}

pub struct Embedder {
    config: EmbeddingConfig,
    dimension: usize,
    model: OnceCell<Option<Arc<dyn EmbeddingModel>>>,
}

impl Embedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            dimension: config.dimension,
            config,
            model: OnceCell::new(),
        }
    }

    /// Embedder with an already-acquired model.
    pub fn with_model(model: Arc<dyn EmbeddingModel>, dimension: usize) -> Self {
        Self {
            config: EmbeddingConfig {
                dimension,
                ..EmbeddingConfig::default()
            },
            dimension,
            model: OnceCell::new_with(Some(Some(model))),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn acquire(&self) -> Option<&Arc<dyn EmbeddingModel>> {
        self.model
            .get_or_init(|| async {
                match http::HttpEmbeddingModel::from_config(&self.config) {
                    Ok(model) => {
                        info!("Embedding model acquired: {}", model.model_name());
                        Some(Arc::new(model) as Arc<dyn EmbeddingModel>)
                    }
                    Err(e) => {
                        warn!("Embedding model unavailable, vectors will be zero-filled: {e}");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    pub async fn embed(&self, text: &str) -> Embedding {
        let Some(model) = self.acquire().await else {
            return Embedding::zero(self.dimension, ZeroFillReason::ModelUnavailable);
        };
        if text.trim().is_empty() {
            return Embedding::zero(self.dimension, ZeroFillReason::EmptyText);
        }

        match model.encode(text).await {
            Ok(vector) if vector.len() == self.dimension => Embedding::Encoded(l2_normalize(vector)),
            Ok(vector) => {
                warn!(
                    expected = self.dimension,
                    actual = vector.len(),
                    "Embedding dimension mismatch, zero-filling"
                );
                Embedding::zero(
                    self.dimension,
                    ZeroFillReason::DimensionMismatch {
                        expected: self.dimension,
                        actual: vector.len(),
                    },
                )
            }
            Err(e) => {
                warn!("Embedding generation failed: {e}");
                Embedding::zero(self.dimension, ZeroFillReason::EncodeFailed(e.to_string()))
            }
        }
    }
}

/// Scales to unit length; the zero vector is returned unchanged.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}
