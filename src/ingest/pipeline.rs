//! Ingestion orchestration.
//!
//! Loads the crawl output, cleans and chunks every page, then syncs the
//! chunks into the vector index with a bounded pool of workers operating on
//! independent document batches. Workers share nothing beyond the external
//! collaborators; the stored state is the union of all batches' upserts.

use std::path::Path;

use anyhow::Context;
use tokio::task::JoinSet;

use super::chunker::ChunkConfig;
use super::cleaner::clean_and_chunk;
use super::{Chunk, Page};
use crate::index::{IndexSyncEngine, SyncReport};

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub chunk: ChunkConfig,
    /// Chunks per worker batch.
    pub document_batch_size: usize,
    /// Maximum concurrent sync workers.
    pub workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            document_batch_size: 200,
            workers: 4,
        }
    }
}

/// Reads the crawl collaborator's output: a JSON array of
/// `{url, content}` records.
pub fn load_scraped_pages(path: &Path) -> anyhow::Result<Vec<Page>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scraped data from {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("Scraped data is not valid JSON")?;
    if !value.is_array() {
        anyhow::bail!("Expected a JSON array of pages in {}", path.display());
    }
    let pages: Vec<Page> =
        serde_json::from_value(value).context("Scraped data records must be {url, content}")?;
    Ok(pages)
}

/// Cleans and chunks every page's content.
pub fn prepare_chunks(pages: &[Page], config: &ChunkConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in pages {
        for text in clean_and_chunk(&page.content, config) {
            chunks.push(Chunk {
                text,
                source_url: page.url.clone(),
            });
        }
    }
    chunks
}

/// Runs the full sync over `chunks` with up to `config.workers` concurrent
/// workers, each handling one document batch end to end. A failed worker is
/// logged and does not abort the others; reports are merged.
pub async fn run(
    engine: &IndexSyncEngine,
    chunks: Vec<Chunk>,
    config: &IngestConfig,
) -> SyncReport {
    let mut report = SyncReport::default();
    if chunks.is_empty() {
        return report;
    }

    let total = chunks.len();
    let batch_size = config.document_batch_size.max(1);
    let batches: Vec<Vec<Chunk>> = chunks
        .chunks(batch_size)
        .map(|batch| batch.to_vec())
        .collect();
    tracing::info!(
        "syncing {} chunks in {} batches with {} workers",
        total,
        batches.len(),
        config.workers.max(1)
    );

    let mut workers: JoinSet<Result<SyncReport, crate::core::errors::ApiError>> = JoinSet::new();
    for batch in batches {
        // Batch boundaries are the cancellation points; a batch in flight
        // runs to completion.
        while workers.len() >= config.workers.max(1) {
            collect_worker(&mut workers, &mut report).await;
        }
        let engine = engine.clone();
        workers.spawn(async move { engine.sync(&batch).await });
    }
    while !workers.is_empty() {
        collect_worker(&mut workers, &mut report).await;
    }

    report
}

async fn collect_worker(
    workers: &mut JoinSet<Result<SyncReport, crate::core::errors::ApiError>>,
    report: &mut SyncReport,
) {
    match workers.join_next().await {
        Some(Ok(Ok(batch_report))) => report.merge(batch_report),
        Some(Ok(Err(err))) => tracing::warn!("sync batch failed: {}", err),
        Some(Err(err)) => tracing::warn!("sync worker panicked: {}", err),
        None => {}
    }
}
