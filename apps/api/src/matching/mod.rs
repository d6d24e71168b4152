//! Similarity ranking against stored embeddings and
//! weighted multi-criteria scoring of stored records.

pub mod handlers;
pub mod scoring;
pub mod similarity;
