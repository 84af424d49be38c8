//! Gemini embedding provider.
//!
//! Uses `models/text-embedding-004` with the `RETRIEVAL_DOCUMENT` task type
//! for stored chunks and `RETRIEVAL_QUERY` for user queries; both produce
//! 768-dimension vectors in the same space.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::EmbeddingProvider;
use crate::core::errors::ApiError;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const EMBED_MODEL: &str = "models/text-embedding-004";

/// Output dimension of `text-embedding-004`.
pub const EMBEDDING_DIMENSION: usize = 768;

const DOCUMENT_TASK: &str = "RETRIEVAL_DOCUMENT";
const QUERY_TASK: &str = "RETRIEVAL_QUERY";

pub struct GeminiEmbedding {
    api_key: String,
    client: Client,
}

impl GeminiEmbedding {
    pub fn new(api_key: String) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { api_key, client })
    }

    fn embed_request(text: &str, task_type: &'static str) -> EmbedRequest {
        EmbedRequest {
            model: EMBED_MODEL.to_string(),
            content: EmbedContent {
                parts: vec![EmbedPart {
                    text: text.to_string(),
                }],
            },
            task_type,
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::upstream)?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<GeminiError>(&body) {
                return Err(ApiError::Upstream(format!(
                    "Gemini API error ({}): {}",
                    error.error.status, error.error.message
                )));
            }
            return Err(ApiError::Upstream(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(ApiError::upstream)
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

#[derive(Serialize)]
struct EmbedPart {
    text: String,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedding {
    fn name(&self) -> &str {
        EMBED_MODEL
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| Self::embed_request(text, DOCUMENT_TASK))
                .collect(),
        };

        let url = format!("{}/{}:batchEmbedContents", GEMINI_API_BASE, EMBED_MODEL);
        let response: BatchEmbedResponse = self.post_json(&url, &request).await?;

        if response.embeddings.len() != texts.len() {
            return Err(ApiError::Upstream(format!(
                "Gemini returned {} embeddings for {} inputs",
                response.embeddings.len(),
                texts.len()
            )));
        }

        Ok(response
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let request = Self::embed_request(text, QUERY_TASK);
        let url = format!("{}/{}:embedContent", GEMINI_API_BASE, EMBED_MODEL);
        let response: EmbedResponse = self.post_json(&url, &request).await?;
        Ok(response.embedding.values)
    }
}
