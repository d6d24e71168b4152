mod config;
mod cv;
mod db;
mod embedding;
mod errors;
mod extraction;
mod llm_client;
mod matching;
mod models;
mod routes;
mod state;
mod storage;
mod structuring;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::cv::ingest::Pipeline;
use crate::cv::store::PgCvStore;
use crate::db::create_pool;
use crate::embedding::Embedder;
use crate::extraction::Extractor;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3BlobStore;
use crate::structuring::Structurer;

#[tokio::main]
async fn main() -> Result<()> {
    // Missing persistence or storage settings abort startup
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let llm = LlmClient::from_config(&config.llm)?;
    match &llm {
        Some(client) => info!("LLM client initialized (model: {})", client.model()),
        None => warn!("LLM_API_KEY not set - CVs will be stored without structured data"),
    }

    let extractor = Extractor::from_config(&config.extraction)?;

    // The embedding model is acquired on first use
    let embedder = Arc::new(Embedder::new(config.embedding.clone()));
    info!(
        "Embedder configured (model: {}, dimension: {})",
        embedder.model_name(),
        embedder.dimension()
    );

    let state = AppState {
        config: config.clone(),
        store: Arc::new(PgCvStore::new(db)),
        blobs: Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone())),
        pipeline: Pipeline::new(extractor, Structurer::new(llm), embedder),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the frontend host is fixed
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// S3 client for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "ats-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets path-style
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
