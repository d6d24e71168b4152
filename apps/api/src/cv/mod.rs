//! Candidate records: normalization, quality scoring, ingestion,
//! persistence and the HTTP surface over them.

pub mod demo;
pub mod handlers;
pub mod ingest;
pub mod normalize;
pub mod quality;
pub mod store;
