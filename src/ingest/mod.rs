//! Ingestion: crawled pages in, deduplicated vectors out.
//!
//! Pipeline: [`cleaner`] normalizes raw HTML, [`chunker`] splits it into
//! overlapping segments, [`identity`] assigns content-addressed ids, and
//! [`pipeline`] drives the parallel sync into the vector index.

pub mod chunker;
pub mod cleaner;
pub mod identity;
pub mod pipeline;

use serde::{Deserialize, Serialize};

pub use chunker::{split_text, ChunkConfig};
pub use cleaner::clean_and_chunk;
pub use identity::chunk_id;
pub use pipeline::{load_scraped_pages, prepare_chunks, IngestConfig};

/// One crawled page, as produced by the crawl collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// A normalized text segment derived from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source_url: String,
}
