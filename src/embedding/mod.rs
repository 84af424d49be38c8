//! Embedding: provider seam, Gemini implementation, batching/retry client.

pub mod client;
pub mod gemini;
pub mod provider;

pub use client::{BatchFailure, EmbedOutcome, EmbeddingClient, RetryPolicy, DEFAULT_BATCH_SIZE};
pub use gemini::{GeminiEmbedding, EMBEDDING_DIMENSION};
pub use provider::EmbeddingProvider;
