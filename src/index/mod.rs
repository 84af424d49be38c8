//! Vector index collaborator.
//!
//! `VectorIndex` abstracts the external index so the sync engine and the
//! retriever can be exercised with test doubles; `PineconeIndex` is the
//! production implementation.

pub mod pinecone;
pub mod sync;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

pub use pinecone::PineconeIndex;
pub use sync::{IndexSyncEngine, SyncReport, UpsertBatch};

/// Metadata stored alongside every vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub text: String,
    pub source: String,
}

/// One `(id, vector, metadata)` triple bound for the index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A ranked nearest-neighbor match.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Abstract interface over the external vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Returns the subset of `ids` already present in the index.
    async fn fetch_existing(&self, ids: &[String]) -> Result<HashSet<String>, ApiError>;

    /// Insert-or-overwrite by id. Re-upserting an existing id is a no-op
    /// overwrite, never an error.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), ApiError>;

    /// Nearest-neighbor query, most similar first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ApiError>;
}
