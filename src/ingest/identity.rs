//! Content-addressed chunk identity.

use sha2::{Digest, Sha256};

/// Deterministic id for a chunk: SHA-256 of the exact text, lowercase hex.
///
/// Identical text always maps to the same id, regardless of source page,
/// batch, or process. This is what makes re-ingestion a no-op.
pub fn chunk_id(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
