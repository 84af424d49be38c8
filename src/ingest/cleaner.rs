//! Text normalization for crawled pages.
//!
//! Turns raw HTML (or a JSON-wrapped crawl record) into clean ASCII text:
//! script/style/noscript/iframe subtrees are dropped entirely, entities are
//! decoded by the parser, unicode is folded to its closest ASCII form, and
//! noisy punctuation/URL fragments are stripped.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use super::chunker::{split_text, ChunkConfig};

/// Elements whose text must never appear in output.
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "iframe"];

static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "[\u{1F600}-\u{1F64F}\u{1F300}-\u{1F5FF}\u{1F680}-\u{1F6FF}\
         \u{1F1E0}-\u{1F1FF}\u{2600}-\u{26FF}\u{2700}-\u{27BF}]+",
    )
    .expect("emoji pattern")
});
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhttps?://\S+\b").expect("url pattern"));
static JSON_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"?url"?:\s*"?https?:.*?"?(,)?"#).expect("json url pattern"));
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^\w\s.,!?;:'"()/-]"#).expect("unsafe chars pattern"));
static REPEATED_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,!?;:]){2,}").expect("repeated punct pattern"));
static REPEATED_HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("repeated hyphen pattern"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,!?;:])").expect("space before punct pattern"));
static MISSING_SPACE_AFTER_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,!?;:])([^\s])").expect("space after punct pattern"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// If the raw input is a JSON blob, pull out the `content` field only.
///
/// Accepts either a single `{url, content}` object or a list of them; any
/// other input is returned verbatim.
pub fn extract_content_from_json(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => match map.get("content").and_then(Value::as_str) {
            Some(content) => content.to_string(),
            None => raw.to_string(),
        },
        Ok(Value::Array(pages)) => pages
            .iter()
            .filter_map(|page| page.get("content").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => raw.to_string(),
    }
}

/// Strips markup and normalizes the remaining text.
///
/// A whitespace-only result is a valid empty output, not an error.
pub fn clean_html(raw_html: &str) -> String {
    let document = Html::parse_document(raw_html);

    let mut text = String::new();
    collect_text(document.root_element(), &mut text);

    let text = normalize_unicode(&text);
    remove_noise(&text)
}

/// Depth-first text extraction that skips [`SKIPPED_ELEMENTS`] subtrees.
/// html5ever has already decoded entities in the text nodes.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(trimmed);
                }
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Folds unicode to its closest ASCII transliteration: NFKD decomposition,
/// then every non-ASCII code point (combining accents, emoji, symbols) is
/// dropped.
pub fn normalize_unicode(text: &str) -> String {
    text.nfkd().filter(char::is_ascii).collect()
}

/// Removes noisy punctuation, symbols, and leftover crawl artifacts like
/// bare URLs and `"url": "..."` fragments.
pub fn remove_noise(text: &str) -> String {
    let text = EMOJI.replace_all(text, " ");
    let text = BARE_URL.replace_all(&text, " ");
    let text = JSON_URL.replace_all(&text, " ");

    let text = UNSAFE_CHARS.replace_all(&text, " ");
    let text = REPEATED_PUNCT.replace_all(&text, "$1");
    let text = REPEATED_HYPHEN.replace_all(&text, "-");

    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = MISSING_SPACE_AFTER_PUNCT.replace_all(&text, "$1 $2");

    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}

/// Full normalization for one crawl record: JSON unwrap, HTML strip, chunk.
pub fn clean_and_chunk(raw_input: &str, config: &ChunkConfig) -> Vec<String> {
    let content_only = extract_content_from_json(raw_input);
    let cleaned = clean_html(&content_only);
    split_text(&cleaned, config)
}
