//! Deduplicated index sync.
//!
//! Given chunks, computes content-addressed ids, asks the index which ids
//! already exist, embeds only the new ones, and upserts in batches.
//! Re-running over unchanged content performs zero embedding calls and zero
//! upserts. The pass is best-effort: a failed upsert batch is recorded and
//! the remaining batches continue.

use std::collections::HashSet;
use std::sync::Arc;

use super::{ChunkMetadata, VectorIndex, VectorRecord};
use crate::core::errors::ApiError;
use crate::embedding::EmbeddingClient;
use crate::ingest::{chunk_id, Chunk};

pub const DEFAULT_SYNC_BATCH_SIZE: usize = 32;

/// Outcome of one upsert batch.
#[derive(Debug, Clone)]
pub enum UpsertBatch {
    Succeeded { count: usize },
    Failed { count: usize, reason: String },
}

/// Aggregated result of a sync pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Chunks handed to the engine.
    pub total: usize,
    /// Chunks whose id was already stored (never re-embedded).
    pub skipped_existing: usize,
    /// New chunks that produced an embedding.
    pub embedded: usize,
    /// New chunks dropped because their embedding batch exhausted retries;
    /// their ids were never stored, so the next run picks them up again.
    pub embed_failures: usize,
    /// Vectors actually written to the index.
    pub upserted: usize,
    pub upsert_batches: Vec<UpsertBatch>,
}

impl SyncReport {
    pub fn merge(&mut self, other: SyncReport) {
        self.total += other.total;
        self.skipped_existing += other.skipped_existing;
        self.embedded += other.embedded;
        self.embed_failures += other.embed_failures;
        self.upserted += other.upserted;
        self.upsert_batches.extend(other.upsert_batches);
    }

    pub fn failed_upsert_batches(&self) -> usize {
        self.upsert_batches
            .iter()
            .filter(|batch| matches!(batch, UpsertBatch::Failed { .. }))
            .count()
    }
}

/// The ingestion core: id assignment, dedup check, embed-only-new, upsert.
#[derive(Clone)]
pub struct IndexSyncEngine {
    index: Arc<dyn VectorIndex>,
    embedder: EmbeddingClient,
    batch_size: usize,
}

impl IndexSyncEngine {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: EmbeddingClient, batch_size: usize) -> Self {
        Self {
            index,
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    /// Syncs `chunks` into the index. Errors only when the existing-id
    /// check itself fails; embedding and upsert failures degrade to report
    /// entries. Safe to run concurrently from several workers: a race on a
    /// not-yet-stored id at worst causes an idempotent duplicate upsert.
    pub async fn sync(&self, chunks: &[Chunk]) -> Result<SyncReport, ApiError> {
        let mut report = SyncReport {
            total: chunks.len(),
            ..Default::default()
        };
        if chunks.is_empty() {
            return Ok(report);
        }

        let ids: Vec<String> = chunks.iter().map(|chunk| chunk_id(&chunk.text)).collect();

        let mut existing = HashSet::new();
        for batch in ids.chunks(self.batch_size) {
            existing.extend(self.index.fetch_existing(batch).await?);
        }

        let new_items: Vec<(&String, &Chunk)> = ids
            .iter()
            .zip(chunks.iter())
            .filter(|(id, _)| !existing.contains(*id))
            .collect();
        report.skipped_existing = chunks.len() - new_items.len();
        tracing::info!(
            "{} of {} chunks already stored, {} to embed",
            report.skipped_existing,
            chunks.len(),
            new_items.len()
        );

        if new_items.is_empty() {
            return Ok(report);
        }

        let texts: Vec<String> = new_items
            .iter()
            .map(|(_, chunk)| chunk.text.clone())
            .collect();
        let outcome = self.embedder.embed_documents(&texts).await;
        report.embedded = outcome.embedded_count();
        report.embed_failures = texts.len() - report.embedded;

        // The outcome is aligned 1:1 with new_items; unembedded entries are
        // dropped here without disturbing the id/vector/metadata zip.
        let records: Vec<VectorRecord> = new_items
            .iter()
            .zip(outcome.vectors)
            .filter_map(|((id, chunk), vector)| {
                vector.map(|values| VectorRecord {
                    id: (*id).clone(),
                    values,
                    metadata: ChunkMetadata {
                        text: chunk.text.clone(),
                        source: chunk.source_url.clone(),
                    },
                })
            })
            .collect();

        for batch in records.chunks(self.batch_size) {
            match self.index.upsert(batch.to_vec()).await {
                Ok(()) => {
                    report.upserted += batch.len();
                    report.upsert_batches.push(UpsertBatch::Succeeded {
                        count: batch.len(),
                    });
                }
                Err(err) => {
                    tracing::warn!("upsert batch of {} failed: {}", batch.len(), err);
                    report.upsert_batches.push(UpsertBatch::Failed {
                        count: batch.len(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embedding::client::tests::{fast_policy, ScriptedProvider};
    use crate::index::QueryMatch;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory stand-in for the external index.
    #[derive(Default)]
    pub(crate) struct InMemoryIndex {
        pub stored: Mutex<HashMap<String, VectorRecord>>,
        /// Any upsert batch containing this text fails.
        pub poison_text: Option<String>,
        pub upsert_calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for InMemoryIndex {
        async fn fetch_existing(&self, ids: &[String]) -> Result<HashSet<String>, ApiError> {
            let stored = self.stored.lock().unwrap();
            Ok(ids
                .iter()
                .filter(|id| stored.contains_key(*id))
                .cloned()
                .collect())
        }

        async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), ApiError> {
            self.upsert_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(poison) = &self.poison_text {
                if records.iter().any(|r| r.metadata.text.contains(poison)) {
                    return Err(ApiError::Upstream("index write rejected".into()));
                }
            }
            let mut stored = self.stored.lock().unwrap();
            for record in records {
                stored.insert(record.id.clone(), record);
            }
            Ok(())
        }

        async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ApiError> {
            let stored = self.stored.lock().unwrap();
            let mut ids: Vec<&String> = stored.keys().collect();
            ids.sort();
            Ok(ids
                .into_iter()
                .take(top_k)
                .map(|id| QueryMatch {
                    id: id.clone(),
                    score: 1.0,
                    metadata: Some(serde_json::json!({
                        "text": stored[id].metadata.text,
                        "source": stored[id].metadata.source,
                    })),
                })
                .collect())
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_url: "https://changiairport.com/attractions".to_string(),
        }
    }

    fn engine(
        index: Arc<InMemoryIndex>,
        provider: Arc<ScriptedProvider>,
        batch_size: usize,
    ) -> IndexSyncEngine {
        let embedder = EmbeddingClient::new(provider, fast_policy(2), batch_size);
        IndexSyncEngine::new(index, embedder, batch_size)
    }

    #[tokio::test]
    async fn second_run_over_unchanged_content_is_a_no_op() {
        let index = Arc::new(InMemoryIndex::default());
        let provider = Arc::new(ScriptedProvider::new());
        let engine = engine(index.clone(), provider.clone(), 32);

        let chunks = vec![chunk("gate1"), chunk("gate2"), chunk("gate3")];

        let first = engine.sync(&chunks).await.unwrap();
        assert_eq!(first.embedded, 3);
        assert_eq!(first.upserted, 3);
        assert_eq!(index.stored.lock().unwrap().len(), 3);

        let embed_calls_after_first = provider.calls.load(Ordering::SeqCst);
        let upsert_calls_after_first = index.upsert_calls.load(Ordering::SeqCst);

        let second = engine.sync(&chunks).await.unwrap();
        assert_eq!(second.skipped_existing, 3);
        assert_eq!(second.embedded, 0);
        assert_eq!(second.upserted, 0);
        // No embedding call and no upsert happened on the second run.
        assert_eq!(provider.calls.load(Ordering::SeqCst), embed_calls_after_first);
        assert_eq!(
            index.upsert_calls.load(Ordering::SeqCst),
            upsert_calls_after_first
        );
        assert_eq!(index.stored.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn only_new_chunks_are_embedded() {
        let index = Arc::new(InMemoryIndex::default());
        let provider = Arc::new(ScriptedProvider::new());
        let engine = engine(index.clone(), provider, 32);

        engine.sync(&[chunk("old5")]).await.unwrap();

        let report = engine
            .sync(&[chunk("old5"), chunk("new6"), chunk("new7")])
            .await
            .unwrap();
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.embedded, 2);
        assert_eq!(index.stored.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_embed_batch_drops_items_without_misalignment() {
        let index = Arc::new(InMemoryIndex::default());
        let provider = Arc::new(ScriptedProvider::new());
        // batch_size 1 puts the failing text in its own embedding batch.
        let engine = engine(index.clone(), provider, 1);

        let report = engine
            .sync(&[chunk("alpha1"), chunk("boom2"), chunk("gamma3")])
            .await
            .unwrap();
        assert_eq!(report.embedded, 2);
        assert_eq!(report.embed_failures, 1);
        assert_eq!(report.upserted, 2);

        // Surviving records carry the vector of their own text, not a
        // neighbor's: the zip stayed aligned.
        let stored = index.stored.lock().unwrap();
        assert_eq!(stored.len(), 2);
        let alpha = &stored[&chunk_id("alpha1")];
        assert_eq!(alpha.values, vec![1.0]);
        let gamma = &stored[&chunk_id("gamma3")];
        assert_eq!(gamma.values, vec![3.0]);
        assert!(!stored.contains_key(&chunk_id("boom2")));
    }

    #[tokio::test]
    async fn failed_upsert_batch_does_not_abort_the_rest() {
        let index = Arc::new(InMemoryIndex {
            poison_text: Some("poison".to_string()),
            ..Default::default()
        });
        let provider = Arc::new(ScriptedProvider::new());
        let engine = engine(index.clone(), provider, 1);

        let report = engine
            .sync(&[chunk("keep1"), chunk("poison2"), chunk("keep3")])
            .await
            .unwrap();
        assert_eq!(report.upserted, 2);
        assert_eq!(report.failed_upsert_batches(), 1);
        assert_eq!(index.stored.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_chunk_set_terminates_without_calls() {
        let index = Arc::new(InMemoryIndex::default());
        let provider = Arc::new(ScriptedProvider::new());
        let engine = engine(index.clone(), provider.clone(), 32);

        let report = engine.sync(&[]).await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(index.upsert_calls.load(Ordering::SeqCst), 0);
    }
}
