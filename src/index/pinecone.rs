//! Pinecone REST client.
//!
//! Control plane (`api.pinecone.io`) is used once at startup to ensure the
//! index exists and resolve its data-plane host; all fetch/upsert/query
//! traffic then goes straight to the host.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{QueryMatch, VectorIndex, VectorRecord};
use crate::core::errors::ApiError;

const CONTROL_PLANE: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2025-01";
const METRIC: &str = "cosine";
const SERVERLESS_CLOUD: &str = "aws";

pub struct PineconeIndex {
    api_key: String,
    client: Client,
    /// Data-plane host for the index, e.g. `myindex-abc123.svc.pinecone.io`.
    host: String,
}

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: String,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

impl PineconeIndex {
    /// Connects to the named index, creating it (serverless, cosine) with
    /// the given dimension if it does not exist yet.
    pub async fn connect(
        api_key: &str,
        environment: &str,
        index_name: &str,
        dimension: usize,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::internal)?;

        let mut index = Self {
            api_key: api_key.to_string(),
            client,
            host: String::new(),
        };

        if let Some(existing) = index.find_index(index_name).await? {
            tracing::info!("Pinecone index '{}' already exists", index_name);
            index.host = existing.host;
        } else {
            tracing::info!("Creating Pinecone index: {}", index_name);
            index.host = index
                .create_index(index_name, environment, dimension)
                .await?;
        }

        if index.host.is_empty() {
            return Err(ApiError::Upstream(format!(
                "Pinecone index '{}' has no data-plane host",
                index_name
            )));
        }
        Ok(index)
    }

    async fn find_index(&self, name: &str) -> Result<Option<IndexDescription>, ApiError> {
        let url = format!("{}/indexes", CONTROL_PLANE);
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(ApiError::upstream)?;
        let list: IndexList = Self::read_json(response, "list indexes").await?;
        Ok(list.indexes.into_iter().find(|index| index.name == name))
    }

    async fn create_index(
        &self,
        name: &str,
        region: &str,
        dimension: usize,
    ) -> Result<String, ApiError> {
        let url = format!("{}/indexes", CONTROL_PLANE);
        let body = json!({
            "name": name,
            "dimension": dimension,
            "metric": METRIC,
            "spec": {
                "serverless": {
                    "cloud": SERVERLESS_CLOUD,
                    "region": region,
                }
            }
        });
        let response = self
            .request(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;
        let created: IndexDescription = Self::read_json(response, "create index").await?;
        Ok(created.host)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn data_url(&self, path: &str) -> String {
        format!("https://{}{}", self.host, path)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await.map_err(ApiError::upstream)?;
        if !status.is_success() {
            return Err(ApiError::Upstream(format!(
                "Pinecone {} failed ({}): {}",
                operation, status, body
            )));
        }
        serde_json::from_str(&body).map_err(ApiError::upstream)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn fetch_existing(&self, ids: &[String]) -> Result<HashSet<String>, ApiError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        let response = self
            .request(self.client.get(self.data_url("/vectors/fetch")))
            .query(&params)
            .send()
            .await
            .map_err(ApiError::upstream)?;
        let fetched: FetchResponse = Self::read_json(response, "fetch").await?;
        Ok(fetched.vectors.into_iter().map(|(id, _)| id).collect())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }
        let body = json!({ "vectors": records });
        let response = self
            .request(self.client.post(self.data_url("/vectors/upsert")))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;
        let _: serde_json::Value = Self::read_json(response, "upsert").await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ApiError> {
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        let response = self
            .request(self.client.post(self.data_url("/query")))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;
        let result: QueryResponse = Self::read_json(response, "query").await?;
        Ok(result.matches)
    }
}
