//! Overlapping text chunking.
//!
//! Splits normalized text into bounded windows for embedding. Cuts prefer
//! semantic boundaries, searched inside the back half of each window in
//! priority order: paragraph break, line break, sentence-ending
//! punctuation, word boundary, then a raw character cut.

use serde::{Deserialize, Serialize};

/// Chunking parameters, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Splits `text` into trimmed, non-empty chunks of at most
/// `config.chunk_size` characters, with consecutive chunks overlapping by
/// up to `config.chunk_overlap` characters. Deterministic for identical
/// input and parameters.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    if total == 0 {
        return chunks;
    }

    let size = config.chunk_size.max(1);
    // An overlap >= size would stall the scan.
    let overlap = config.chunk_overlap.min(size.saturating_sub(1));

    let mut start = 0;
    loop {
        let hard_end = (start + size).min(total);
        let end = if hard_end == total {
            total
        } else {
            find_cut(&chars, start, hard_end)
        };

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= total {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Picks the cut position in `(start, hard_end]`, searching backward from
/// `hard_end` but never cutting before the middle of the window.
fn find_cut(chars: &[char], start: usize, hard_end: usize) -> usize {
    let floor = start + (hard_end - start) / 2;

    // Paragraph break: cut just after a blank line.
    for i in (floor.max(start + 2)..=hard_end).rev() {
        if chars[i - 1] == '\n' && chars[i - 2] == '\n' {
            return i;
        }
    }
    // Line break.
    for i in (floor.max(start + 1)..=hard_end).rev() {
        if chars[i - 1] == '\n' {
            return i;
        }
    }
    // Sentence end: punctuation followed by whitespace (or the window edge).
    for i in (floor.max(start + 1)..=hard_end).rev() {
        if matches!(chars[i - 1], '.' | '!' | '?')
            && (i == hard_end || chars[i].is_whitespace())
        {
            return i;
        }
    }
    // Word boundary.
    for i in (floor.max(start + 1)..=hard_end).rev() {
        if chars[i - 1].is_whitespace() {
            return i;
        }
    }

    hard_end
}
