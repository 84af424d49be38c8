use async_trait::async_trait;

use crate::core::errors::ApiError;

/// Interface over the generation service: one synchronous completion per
/// prompt, no streaming, no retry; a failure propagates to the caller.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name (e.g. "groq", "gemini").
    fn name(&self) -> &str;

    /// Generate a completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ApiError>;
}
