use async_trait::async_trait;

use crate::core::errors::ApiError;

/// Interface over an embedding service.
///
/// Document and query embeddings may use different task-oriented
/// configurations upstream, but both must land in the same vector space
/// with the same dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider/model identifier (e.g. "models/text-embedding-004").
    fn name(&self) -> &str;

    /// Fixed output dimension.
    fn dimension(&self) -> usize;

    /// Embed one batch of documents with a single upstream call.
    /// Must return exactly one vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    /// Embed a single user query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError>;
}
