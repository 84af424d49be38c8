//! Retrieval-augmented question answering backend for the Changi Airport
//! documentation corpus. The ingestion side cleans and chunks scraped
//! pages, assigns content-addressed ids, and syncs only new chunks into a
//! Pinecone index; the query side retrieves context and composes a
//! grounded answer through a configurable generation provider.

pub mod chat;
pub mod config;
pub mod core;
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod server;
pub mod state;

pub use config::Config;
pub use core::errors::ApiError;
pub use state::AppState;
