//! Document chunking.
//!
//! This module provides two layers:
//!
//! - [`TextChunker`]: splits one block of text into overlapping windows that
//!   prefer to end on paragraph or sentence boundaries
//! - [`Chunker`] / [`SectionChunker`]: turns a whole [`Document`] into [`Chunk`]s
//!   by splitting it into sections first, then windowing each section and
//!   assigning deterministic ids and per-chunk metadata

use std::ops::Range;
use std::sync::Arc;

use crate::document::{CHUNK_INDEX, Chunk, Document, MetadataValue, SECTION};
use crate::identity::{UNKNOWN_SOURCE, chunk_id};
use crate::sections::{ItemHeaderSplitter, SectionSplitter};

/// Default window length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text, ids and metadata but no
/// embeddings. Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks, in `chunk_index` order.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into overlapping windows of at most `chunk_size` characters.
///
/// Each window `[start, start + chunk_size)` is shortened to end after the
/// last paragraph break (`\n\n`) or, failing that, just after the last
/// sentence terminator (`. ` / `.\n`), provided the boundary lies past the
/// window's midpoint. The next window starts `chunk_overlap` characters
/// before the previous end. Whitespace-only windows are dropped.
///
/// # Example
///
/// ```rust
/// use finrag::TextChunker;
///
/// let chunker = TextChunker::new(1000, 200);
/// assert_eq!(chunker.split("Short filing excerpt."), vec!["Short filing excerpt."]);
/// assert!(chunker.split("  \n ").is_empty());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextChunker {
    /// Create a new `TextChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of characters repeated at the start of the next chunk
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Split `text` into windows, borrowing from the input.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.split_spans(text).into_iter().map(|span| &text[span]).collect()
    }

    /// Split `text` into windows, returning their byte ranges.
    ///
    /// Sizes are counted in characters; every range lies on `char` boundaries.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let len = offsets.len();
        let byte_at = |pos: usize| offsets.get(pos).copied().unwrap_or(text.len());
        let keep = |span: &Range<usize>| !text[span.clone()].trim().is_empty();

        // A zero-length window could never advance.
        let size = self.chunk_size.max(1);
        if len <= size {
            let whole = 0..text.len();
            return if keep(&whole) { vec![whole] } else { Vec::new() };
        }

        let midpoint = size / 2;
        let mut spans = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = start + size;
            if end >= len {
                let tail = byte_at(start)..text.len();
                if keep(&tail) {
                    spans.push(tail);
                }
                break;
            }

            let window_start = byte_at(start);
            let window = &text[window_start..byte_at(end)];
            let to_char = |rel: usize| offsets.partition_point(|&b| b < window_start + rel);
            let past_midpoint = |pos: &usize| *pos > start + midpoint;

            if let Some(para) = window.rfind("\n\n").map(to_char).filter(past_midpoint) {
                end = para + 2;
            } else if let Some(period) =
                window.rfind(". ").max(window.rfind(".\n")).map(to_char).filter(past_midpoint)
            {
                end = period + 1;
            }

            let span = window_start..byte_at(end);
            if keep(&span) {
                spans.push(span);
            }

            start = if end > start + self.chunk_overlap { end - self.chunk_overlap } else { end };
        }

        spans
    }
}

/// Section-aware document chunker.
///
/// Splits the document with a [`SectionSplitter`], windows every section with
/// a [`TextChunker`], and numbers the resulting chunks with a single
/// `chunk_index` counter running across all sections. Each chunk inherits the
/// document metadata plus `chunk_index` and, for named sections, `section`.
/// Chunk ids come from [`chunk_id`] keyed by the document's `source_file`.
///
/// # Example
///
/// ```rust
/// use finrag::{Chunker, Document, SectionChunker};
///
/// let document = Document::new("ITEM 1. Business\nWe sell phones.\nITEM 2. Properties\nCupertino.")
///     .with_metadata("source_file", "AAPL/10-K.html");
/// let chunks = SectionChunker::default().chunk(&document);
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[1].metadata["section"].as_str(), Some("ITEM 2"));
/// ```
#[derive(Clone)]
pub struct SectionChunker {
    splitter: Arc<dyn SectionSplitter>,
    text_chunker: TextChunker,
}

impl Default for SectionChunker {
    fn default() -> Self {
        Self::new(Arc::new(ItemHeaderSplitter), TextChunker::default())
    }
}

impl SectionChunker {
    /// Create a chunker from a section strategy and a window chunker.
    pub fn new(splitter: Arc<dyn SectionSplitter>, text_chunker: TextChunker) -> Self {
        Self { splitter, text_chunker }
    }

    /// Use the default ITEM/PART splitter with the given window sizes.
    pub fn with_sizes(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self::new(Arc::new(ItemHeaderSplitter), TextChunker::new(chunk_size, chunk_overlap))
    }
}

impl Chunker for SectionChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let source = document.source_file().unwrap_or(UNKNOWN_SOURCE);
        let mut chunks = Vec::new();

        for section in self.splitter.split(&document.text) {
            for text in self.text_chunker.split(section.text) {
                let chunk_index = chunks.len();
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX.to_string(), MetadataValue::from(chunk_index));
                if !section.name.is_empty() {
                    metadata.insert(SECTION.to_string(), MetadataValue::from(section.name.as_str()));
                }

                chunks.push(Chunk {
                    id: chunk_id(source, chunk_index),
                    text: text.to_string(),
                    embedding: Vec::new(),
                    metadata,
                });
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::WholeTextSplitter;

    #[test]
    fn short_text_is_single_chunk() {
        let chunker = TextChunker::new(100, 20);
        assert_eq!(chunker.split("  hello  "), vec!["  hello  "]);
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        assert!(TextChunker::new(100, 20).split(" \n\t ").is_empty());
        assert!(TextChunker::new(4, 1).split("          ").is_empty());
        assert!(TextChunker::default().split("").is_empty());
    }

    #[test]
    fn prefers_paragraph_break_past_midpoint() {
        // break at char 14, window of 20 → midpoint 10
        let text = format!("{}\n\n{}", "a".repeat(14), "b".repeat(30));
        let chunks = TextChunker::new(20, 5).split(&text);
        assert_eq!(chunks[0], format!("{}\n\n", "a".repeat(14)));
        // next window starts 5 chars before the previous end
        assert!(chunks[1].starts_with("aaa\n\n"));
    }

    #[test]
    fn falls_back_to_sentence_end() {
        let text = format!("{}. {}", "a".repeat(14), "b".repeat(30));
        let chunks = TextChunker::new(20, 0).split(&text);
        assert_eq!(chunks[0], format!("{}.", "a".repeat(14)));
        assert!(chunks[1].starts_with(' '));
    }

    #[test]
    fn ignores_boundaries_before_midpoint() {
        let text = format!("aa. {}", "b".repeat(40));
        let chunks = TextChunker::new(20, 0).split(&text);
        assert_eq!(chunks[0].chars().count(), 20);
    }

    #[test]
    fn hard_cut_and_overlap() {
        let text: String = ('a'..='z').cycle().take(50).collect();
        let chunks = TextChunker::new(20, 5).split(&text);
        assert_eq!(chunks[0], &text[0..20]);
        assert_eq!(chunks[1], &text[15..35]);
        assert_eq!(chunks[2], &text[30..50]);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn overlap_not_smaller_than_window_still_progresses() {
        let text = "x".repeat(30);
        let chunks = TextChunker::new(10, 10).split(&text);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(25);
        let chunks = TextChunker::new(10, 2).split(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks[0].chars().count(), 10);
    }

    #[test]
    fn chunk_index_runs_across_sections() {
        let body = "Revenue grew. ".repeat(10);
        let text = format!("Preamble\nITEM 1. Business\n{body}\nITEM 2. Properties\n{body}");
        let document = Document::new(text)
            .with_metadata("source_file", "AAPL/10-K.html")
            .with_metadata("ticker", "AAPL");

        let chunks = SectionChunker::with_sizes(60, 10).chunk(&document);
        assert!(chunks.len() > 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata[CHUNK_INDEX], MetadataValue::Integer(i as i64));
            assert_eq!(chunk.metadata["ticker"].as_str(), Some("AAPL"));
            assert_eq!(chunk.id, chunk_id("AAPL/10-K.html", i));
        }
        assert!(!chunks[0].metadata.contains_key(SECTION));
        assert_eq!(chunks.last().unwrap().metadata[SECTION].as_str(), Some("ITEM 2"));
    }

    #[test]
    fn missing_source_uses_sentinel() {
        let chunks = SectionChunker::default().chunk(&Document::new("Some text."));
        assert_eq!(chunks[0].id, chunk_id(UNKNOWN_SOURCE, 0));
    }

    #[test]
    fn pluggable_splitter() {
        let chunker = SectionChunker::new(Arc::new(WholeTextSplitter), TextChunker::default());
        let chunks = chunker.chunk(&Document::new("ITEM 1. A\nITEM 2. B"));
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].metadata.contains_key(SECTION));
    }
}
