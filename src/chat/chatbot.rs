//! Answer composition: sanitize the query, retrieve context, filter out
//! boilerplate, build the prompt, call generation once.

use std::sync::LazyLock;
use std::sync::Arc;

use regex::Regex;

use super::prompt::{build_prompt, NOT_FOUND_MESSAGE};
use super::retriever::{Retriever, DEFAULT_TOP_K};
use crate::core::errors::ApiError;
use crate::llm::GenerationProvider;

const MAX_QUERY_LENGTH: usize = 1000;
/// Lines at or under this length are treated as navigation junk.
const MIN_LINE_LENGTH: usize = 15;
/// Chunks under this length after line filtering are dropped entirely.
const MIN_CHUNK_LENGTH: usize = 50;

/// Social/cookie/legal boilerplate markers, matched case-insensitively
/// within a line.
const BOILERPLATE: [&str; 8] = [
    "save share",
    "facebook",
    "tiktok",
    "cookie",
    "terms",
    "sign up",
    "oops",
    "copyright",
];

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("code block pattern"));

/// Cleans a user query: rejects empty input, bounds the length, removes
/// fenced code blocks (prompt-injection surface).
pub fn sanitize_query(query: &str) -> Result<String, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query cannot be empty".into()));
    }
    let query: String = query.chars().take(MAX_QUERY_LENGTH).collect();
    Ok(CODE_BLOCK
        .replace_all(&query, "[removed code block]")
        .into_owned())
}

/// Drops short lines and boilerplate from each retrieved chunk; chunks
/// left with fewer than [`MIN_CHUNK_LENGTH`] characters are discarded.
pub fn clean_context(chunks: &[String]) -> Vec<String> {
    let mut cleaned = Vec::new();
    for chunk in chunks {
        let kept: Vec<&str> = chunk
            .lines()
            .map(str::trim)
            .filter(|line| {
                line.len() > MIN_LINE_LENGTH && {
                    let lower = line.to_lowercase();
                    !BOILERPLATE.iter().any(|marker| lower.contains(marker))
                }
            })
            .collect();
        let combined = kept.join(" ").trim().to_string();
        if combined.len() > MIN_CHUNK_LENGTH {
            cleaned.push(combined);
        }
    }
    cleaned
}

/// Numbers the surviving chunks for the prompt.
pub fn format_context(chunks: &[String]) -> String {
    clean_context(chunks)
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The query-path pipeline: retrieve, compose, generate.
#[derive(Clone)]
pub struct Chatbot {
    retriever: Retriever,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
}

impl Chatbot {
    pub fn new(retriever: Retriever, generator: Arc<dyn GenerationProvider>) -> Self {
        Self {
            retriever,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Answers a user query.
    ///
    /// Empty retrieval short-circuits to the fixed not-found message
    /// without a generation call. If the boilerplate filter removes all
    /// context, generation still runs: the prompt instructs the model to
    /// say it cannot find relevant information, and for off-domain
    /// questions to reply with the fixed refusal sentence. Upstream
    /// failures propagate; they are never masked as a "no answer".
    pub async fn answer(&self, query: &str) -> Result<String, ApiError> {
        let query = sanitize_query(query)?;

        let context_chunks = self.retriever.retrieve(&query, self.top_k).await?;
        if context_chunks.is_empty() {
            return Ok(NOT_FOUND_MESSAGE.to_string());
        }

        let prompt = build_prompt(&format_context(&context_chunks), &query);
        let answer = self.generator.generate(&prompt).await?;
        Ok(answer.trim().to_string())
    }
}
