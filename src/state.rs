use std::sync::Arc;

use crate::chat::{Chatbot, Retriever};
use crate::config::Config;
use crate::core::errors::ApiError;
use crate::embedding::{EmbeddingClient, GeminiEmbedding, EMBEDDING_DIMENSION};
use crate::index::PineconeIndex;
use crate::llm;

/// Shared application state. Handles are wired once at startup and passed
/// into the router; handlers never reach for globals.
pub struct AppState {
    pub config: Config,
    pub chatbot: Chatbot,
}

impl AppState {
    /// Builds every service handle from configuration: embedding client,
    /// vector index connection, generation provider, and the chatbot that
    /// ties them together.
    pub async fn initialize(config: Config) -> Result<Arc<Self>, ApiError> {
        let embedder = GeminiEmbedding::new(config.gemini_api_key.clone())?;
        let embedder = EmbeddingClient::with_defaults(Arc::new(embedder));

        let index = PineconeIndex::connect(
            &config.pinecone_api_key,
            &config.pinecone_environment,
            &config.pinecone_index,
            EMBEDDING_DIMENSION,
        )
        .await?;

        let generator = llm::from_config(&config)?;
        tracing::info!("generation backend: {}", generator.name());

        let retriever = Retriever::new(embedder, Arc::new(index));
        let chatbot = Chatbot::new(retriever, generator);

        Ok(Arc::new(Self { config, chatbot }))
    }
}
