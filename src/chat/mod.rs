//! Query-time path: retrieval, prompt assembly, answer composition.

pub mod chatbot;
pub mod prompt;
pub mod retriever;

pub use chatbot::{sanitize_query, Chatbot};
pub use prompt::{build_prompt, DOMAIN_REFUSAL, NOT_FOUND_MESSAGE};
pub use retriever::{Retriever, DEFAULT_TOP_K};
