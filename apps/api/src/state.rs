use std::sync::Arc;

use crate::config::Config;
use crate::cv::ingest::Pipeline;
use crate::cv::store::CvStore;
use crate::storage::BlobStore;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every collaborator is built once in `main` and shared behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CvStore>,
    pub blobs: Arc<dyn BlobStore>,
    /// Extractor, Structurer and Embedder. The embedder also encodes search queries.
    pub pipeline: Pipeline,
}
