//! Generation providers, selected at startup by configuration.

pub mod gemini;
pub mod groq;
pub mod provider;

use std::sync::Arc;

pub use gemini::GeminiChat;
pub use groq::GroqProvider;
pub use provider::GenerationProvider;

use crate::config::{Config, GenerationBackend};
use crate::core::errors::ApiError;

/// Builds the configured generation provider.
pub fn from_config(config: &Config) -> Result<Arc<dyn GenerationProvider>, ApiError> {
    match config.generation_backend {
        GenerationBackend::Groq => {
            let api_key = config
                .groq_api_key
                .clone()
                .ok_or_else(|| ApiError::Internal("GROQ_API_KEY not configured".into()))?;
            Ok(Arc::new(GroqProvider::new(api_key)?))
        }
        GenerationBackend::Gemini => Ok(Arc::new(GeminiChat::new(config.gemini_api_key.clone())?)),
    }
}
