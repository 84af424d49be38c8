//! Top-k retrieval for the query path.

use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::embedding::EmbeddingClient;
use crate::index::VectorIndex;

pub const DEFAULT_TOP_K: usize = 5;

/// Embeds a query and returns the nearest stored chunk texts, most similar
/// first (the index's own order).
#[derive(Clone)]
pub struct Retriever {
    embedder: EmbeddingClient,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: EmbeddingClient, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Returns the texts of the `top_k` nearest chunks. Matches without a
    /// `metadata.text` field are skipped; an empty index yields an empty
    /// list, not an error.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, ApiError> {
        let vector = self.embedder.embed_query(query).await?;
        let matches = self.index.query(&vector, top_k).await?;

        Ok(matches
            .into_iter()
            .filter_map(|m| {
                m.metadata
                    .and_then(|metadata| metadata.get("text").and_then(|t| t.as_str()).map(String::from))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::client::tests::{fast_policy, ScriptedProvider};
    use crate::index::{QueryMatch, VectorRecord};
    use async_trait::async_trait;
    use std::collections::HashSet;

    /// Index double returning a fixed match list.
    struct FixedIndex {
        matches: Vec<QueryMatch>,
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn fetch_existing(&self, _ids: &[String]) -> Result<HashSet<String>, ApiError> {
            Ok(HashSet::new())
        }

        async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<(), ApiError> {
            Ok(())
        }

        async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ApiError> {
            Ok(self.matches.iter().take(top_k).cloned().collect())
        }
    }

    fn retriever(matches: Vec<QueryMatch>) -> Retriever {
        let embedder = EmbeddingClient::new(Arc::new(ScriptedProvider::new()), fast_policy(1), 32);
        Retriever::new(embedder, Arc::new(FixedIndex { matches }))
    }

    fn match_with_text(id: &str, text: &str) -> QueryMatch {
        QueryMatch {
            id: id.into(),
            score: 0.9,
            metadata: Some(serde_json::json!({ "text": text })),
        }
    }

    #[tokio::test]
    async fn returns_texts_in_index_order() {
        let retriever = retriever(vec![
            match_with_text("a", "first chunk"),
            match_with_text("b", "second chunk"),
        ]);
        let texts = retriever.retrieve("jewel attractions", 5).await.unwrap();
        assert_eq!(texts, vec!["first chunk", "second chunk"]);
    }

    #[tokio::test]
    async fn skips_matches_without_text_metadata() {
        let retriever = retriever(vec![
            match_with_text("a", "kept"),
            QueryMatch {
                id: "b".into(),
                score: 0.5,
                metadata: None,
            },
            QueryMatch {
                id: "c".into(),
                score: 0.4,
                metadata: Some(serde_json::json!({ "source": "no text here" })),
            },
        ]);
        let texts = retriever.retrieve("anything", 5).await.unwrap();
        assert_eq!(texts, vec!["kept"]);
    }

    #[tokio::test]
    async fn empty_index_is_not_an_error() {
        let retriever = retriever(Vec::new());
        let texts = retriever.retrieve("anything", 5).await.unwrap();
        assert!(texts.is_empty());
    }
}
