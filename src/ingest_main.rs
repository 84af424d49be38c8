//! Ingestion entrypoint: loads the scraped corpus, cleans and chunks it,
//! and syncs new chunks into the vector index. Safe to re-run; chunks
//! already present are skipped.

use std::sync::Arc;

use anyhow::Context;

use changi_backend::config::Config;
use changi_backend::core;
use changi_backend::embedding::{EmbeddingClient, GeminiEmbedding, EMBEDDING_DIMENSION};
use changi_backend::index::{IndexSyncEngine, PineconeIndex};
use changi_backend::ingest::pipeline::{self, IngestConfig};
use changi_backend::ingest::{load_scraped_pages, prepare_chunks};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;
    core::logging::init(&config.log_dir);

    let pages = load_scraped_pages(&config.scraped_data_path)?;
    tracing::info!("loaded {} scraped pages", pages.len());

    let ingest_config = IngestConfig::default();
    let chunks = prepare_chunks(&pages, &ingest_config.chunk);
    if chunks.is_empty() {
        tracing::warn!("no usable content in the scraped corpus; nothing to sync");
        return Ok(());
    }

    let embedder = GeminiEmbedding::new(config.gemini_api_key.clone())
        .map_err(|err| anyhow::anyhow!("embedding client: {}", err))?;
    let embedder = EmbeddingClient::with_defaults(Arc::new(embedder));

    let index = PineconeIndex::connect(
        &config.pinecone_api_key,
        &config.pinecone_environment,
        &config.pinecone_index,
        EMBEDDING_DIMENSION,
    )
    .await
    .map_err(|err| anyhow::anyhow!("index connection: {}", err))?;

    let engine = IndexSyncEngine::new(
        Arc::new(index),
        embedder,
        changi_backend::index::sync::DEFAULT_SYNC_BATCH_SIZE,
    );

    let report = pipeline::run(&engine, chunks, &ingest_config).await;
    tracing::info!(
        "sync complete: {} chunks, {} already indexed, {} embedded, {} upserted, {} embed failures, {} failed upsert batches",
        report.total,
        report.skipped_existing,
        report.embedded,
        report.upserted,
        report.embed_failures,
        report.failed_upsert_batches()
    );

    Ok(())
}
