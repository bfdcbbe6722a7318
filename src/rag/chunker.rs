//! Fixed-window text chunking with overlap.
//!
//! Sizes are counted in `char`s, so a window never splits a UTF-8 sequence.
//! For ASCII input this is the same as counting bytes.

use crate::types::{AppError, Chunk, Result};
use crate::utils::toml_config::ChunkingConfig;

#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Requires `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::Validation(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Validation(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.chunk_with_metadata(text)
            .into_iter()
            .map(|c| c.content)
            .collect()
    }

    /// Split `text` into windows of at most `chunk_size` chars, each starting
    /// `chunk_overlap` chars before the previous one ended.
    ///
    /// Text no longer than the overlap yields no chunks.
    pub fn chunk_with_metadata(&self, text: &str) -> Vec<Chunk> {
        // Byte offset of every char boundary, including the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start + self.chunk_overlap < len {
            let end = (start + self.chunk_size).min(len);
            let (start_byte, end_byte) = (bounds[start], bounds[end]);
            chunks.push(Chunk {
                content: text[start_byte..end_byte].to_string(),
                sequence_index: chunks.len(),
                start_byte,
                end_byte,
            });
            start = end - self.chunk_overlap;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_fixed_window_with_overlap() {
        let chunker = TextChunker::new(4, 1).unwrap();
        assert_eq!(chunker.chunk("ABCDEFGHIJ"), vec!["ABCD", "DEFG", "GHIJ"]);
    }

    #[test]
    fn test_no_overlap_leaves_short_tail() {
        let chunker = TextChunker::new(4, 0).unwrap();
        assert_eq!(chunker.chunk("ABCDEFGHIJ"), vec!["ABCD", "EFGH", "IJ"]);
    }

    #[test]
    fn test_text_shorter_than_size_is_one_chunk() {
        let chunker = TextChunker::new(500, 100).unwrap();
        assert_eq!(chunker.chunk("short document body"), vec!["short document body"]);
    }

    #[rstest]
    #[case("", 4, 1)]
    #[case("A", 4, 1)]
    #[case("ABC", 4, 3)]
    fn test_text_within_overlap_yields_nothing(
        #[case] text: &str,
        #[case] size: usize,
        #[case] overlap: usize,
    ) {
        let chunker = TextChunker::new(size, overlap).unwrap();
        assert!(chunker.chunk(text).is_empty());
    }

    #[rstest]
    #[case(0, 0)]
    #[case(4, 4)]
    #[case(4, 9)]
    fn test_invalid_parameters(#[case] size: usize, #[case] overlap: usize) {
        assert!(matches!(
            TextChunker::new(size, overlap),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_multibyte_text_keeps_char_boundaries() {
        let text = "héllo wörld ✓ ünïcode";
        let chunker = TextChunker::new(5, 2).unwrap();
        let chunks = chunker.chunk_with_metadata(text);

        assert_eq!(chunks[0].content, "héllo");
        assert_eq!(chunks[0].start_byte, 0);
        assert_eq!(chunks[0].end_byte, "héllo".len());
        for c in &chunks {
            assert_eq!(&text[c.start_byte..c.end_byte], c.content);
            assert!(c.content.chars().count() <= 5);
        }
    }

    #[test]
    fn test_sequence_indexes_are_contiguous() {
        let chunker = TextChunker::new(3, 1).unwrap();
        let chunks = chunker.chunk_with_metadata("abcdefghijklmnop");
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.sequence_index, i);
        }
    }

    const SAMPLE: &str = "Retrieval augmented generation grounds a model's answer in \
        passages pulled from a private corpus. Ünïcödé text — with dashes, emoji 🚀 and \
        accents — must survive chunking intact.";

    #[rstest]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(7, 3)]
    #[case(16, 15)]
    #[case(50, 10)]
    #[case(500, 100)]
    fn test_chunking_properties(#[case] size: usize, #[case] overlap: usize) {
        let chunker = TextChunker::new(size, overlap).unwrap();
        let chunks = chunker.chunk(SAMPLE);
        assert!(!chunks.is_empty());

        // Every chunk fits the window.
        for c in &chunks {
            assert!(c.chars().count() <= size);
        }

        // Neighbors share exactly `overlap` chars.
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            assert_eq!(prev[prev.len() - overlap..], next[..overlap]);
        }

        // Dropping each later chunk's overlap rebuilds the text.
        let mut rebuilt = chunks[0].clone();
        for c in &chunks[1..] {
            rebuilt.extend(c.chars().skip(overlap));
        }
        assert_eq!(rebuilt, SAMPLE);
    }
}
