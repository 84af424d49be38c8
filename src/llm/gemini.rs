//! Gemini generation provider (alternate backend, selected via config).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::GenerationProvider;
use crate::core::errors::ApiError;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const MODEL: &str = "gemini-1.5-flash-latest";
const TEMPERATURE: f32 = 0.4;

pub struct GeminiChat {
    api_key: String,
    client: Client,
}

impl GeminiChat {
    pub fn new(api_key: String) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { api_key, client })
    }
}

#[async_trait]
impl GenerationProvider for GeminiChat {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let url = format!("{}/models/{}:generateContent", GEMINI_API_BASE, MODEL);
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": TEMPERATURE},
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("Gemini chat error: {}", text)));
        }

        let payload: Value = response.json().await.map_err(ApiError::upstream)?;
        let content = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| ApiError::Upstream("Gemini response missing text".into()))?;

        Ok(content.to_string())
    }
}
