//! Groq generation provider (OpenAI-compatible chat completions).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::GenerationProvider;
use crate::core::errors::ApiError;

const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
const MODEL: &str = "llama3-8b-8192";
const TEMPERATURE: f32 = 0.4;

pub struct GroqProvider {
    api_key: String,
    client: Client,
}

impl GroqProvider {
    pub fn new(api_key: String) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { api_key, client })
    }
}

#[async_trait]
impl GenerationProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let url = format!("{}/chat/completions", GROQ_API_BASE);
        let body = json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": TEMPERATURE,
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("Groq chat error: {}", text)));
        }

        let payload: Value = response.json().await.map_err(ApiError::upstream)?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ApiError::Upstream("Groq response missing content".into()))?;

        Ok(content.to_string())
    }
}
