//! Chunkers used by the ingestion pipeline.
//!
//! `WordWindowChunker` slides a fixed word window with overlap across the
//! whole text. `ParagraphChunker` keeps blank-line separated paragraphs intact
//! while they fit a token budget and falls back to word windows otherwise.

use crate::traits::Chunker;

/// Rough token estimate: ~0.75 words per token.
fn count_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

fn word_windows(words: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[derive(Debug, Clone)]
pub struct WordWindowChunker {
    chunk_words: usize,
    overlap_words: usize,
}

impl WordWindowChunker {
    #[must_use]
    pub fn new(chunk_words: usize, overlap_words: usize) -> Self {
        Self { chunk_words, overlap_words }
    }
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self::new(300, 50)
    }
}

impl Chunker for WordWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        word_windows(&words, self.chunk_words, self.overlap_words)
    }
}

#[derive(Debug, Clone)]
pub struct ParagraphChunker {
    max_tokens: usize,
    window_words: usize,
    overlap_words: usize,
}

impl ParagraphChunker {
    #[must_use]
    pub fn new(max_tokens: usize, window_words: usize, overlap_words: usize) -> Self {
        Self { max_tokens, window_words, overlap_words }
    }
}

impl Default for ParagraphChunker {
    fn default() -> Self {
        Self::new(500, 300, 60)
    }
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = text.replace("\r\n", "\n");
        let mut chunks = Vec::new();
        for paragraph in normalized.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if count_tokens(paragraph) <= self.max_tokens {
                chunks.push(paragraph.to_string());
            } else {
                let words: Vec<&str> = paragraph.split_whitespace().collect();
                chunks.extend(word_windows(&words, self.window_words, self.overlap_words));
            }
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn word_windows_advance_by_size_minus_overlap() {
        let chunker = WordWindowChunker::new(4, 1);
        let chunks = chunker.chunk(&numbered_words(10));
        assert_eq!(chunks, vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]);
    }

    #[test]
    fn word_windows_stop_at_last_word() {
        let chunker = WordWindowChunker::new(4, 1);
        let chunks = chunker.chunk(&numbered_words(5));
        assert_eq!(chunks, vec!["w0 w1 w2 w3", "w3 w4"]);
    }

    #[test]
    fn blank_text_yields_no_chunks() {
        assert!(WordWindowChunker::default().chunk(" \n\t ").is_empty());
        assert!(ParagraphChunker::default().chunk("\n\n  \n\n").is_empty());
    }

    #[test]
    fn overlap_not_smaller_than_window_still_progresses() {
        let chunker = WordWindowChunker::new(2, 5);
        let chunks = chunker.chunk(&numbered_words(3));
        assert_eq!(chunks, vec!["w0 w1", "w1 w2"]);
    }

    #[test]
    fn paragraphs_kept_whole_when_small() {
        let chunker = ParagraphChunker::default();
        let chunks = chunker.chunk("first paragraph\r\n\r\nsecond one\n\n\n\nthird");
        assert_eq!(chunks, vec!["first paragraph", "second one", "third"]);
    }

    #[test]
    fn oversized_paragraph_is_windowed() {
        let chunker = ParagraphChunker::new(3, 3, 1);
        let chunks = chunker.chunk(&format!("short\n\n{}", numbered_words(5)));
        assert_eq!(chunks, vec!["short", "w0 w1 w2", "w2 w3 w4"]);
    }
}
