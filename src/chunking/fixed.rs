//! Fixed-size chunking strategy.
//!
//! Walks the text in steps of `chunk_size - overlap` chars. Offsets are char
//! offsets, so multi-byte characters are never split.

use crate::chunking::traits::{Chunker, DecomposeOptions};
use crate::core::Chunk;
use crate::error::Result;
use crate::io::CharIndex;

/// Fixed-size chunker with char overlap.
///
/// When `overlap >= chunk_size` the step would not advance, so only the
/// first chunk is produced.
///
/// # Examples
///
/// ```
/// use rlm_context::chunking::{Chunker, DecomposeOptions, FixedChunker};
///
/// let chunks = FixedChunker
///     .chunk("0123456789", &DecomposeOptions::with_size_and_overlap(4, 1))
///     .unwrap();
/// let spans: Vec<_> = chunks.iter().map(|c| (c.start_offset, c.end_offset)).collect();
/// assert_eq!(spans, vec![(0, 4), (3, 7), (6, 10), (9, 10)]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedChunker;

impl Chunker for FixedChunker {
    fn chunk(&self, text: &str, options: &DecomposeOptions) -> Result<Vec<Chunk>> {
        DecomposeOptions::require_positive(options.chunk_size, "chunk_size")?;

        let index = CharIndex::new(text);
        let len = index.char_len();
        let step = options.chunk_size.saturating_sub(options.overlap);

        let mut chunks = Vec::new();
        let mut offset = 0;

        while offset < len {
            let end = offset.saturating_add(options.chunk_size).min(len);
            chunks.push(Chunk::new(
                chunks.len(),
                index.slice(offset, end).to_string(),
                offset,
                end,
            ));

            // Degenerate step: stop rather than loop forever
            if step == 0 {
                break;
            }
            offset += step;
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "fixed_size"
    }

    fn description(&self) -> &'static str {
        "Fixed-size char windows with optional overlap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_chunker_empty_text() {
        let chunks = FixedChunker.chunk("", &DecomposeOptions::with_size(100)).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_fixed_chunker_small_text() {
        let text = "Hello, world!";
        let chunks = FixedChunker.chunk(text, &DecomposeOptions::with_size(100)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!((chunks[0].start_offset, chunks[0].end_offset), (0, 13));
    }

    #[test]
    fn test_fixed_chunker_multiple_chunks() {
        let text = "0123456789ABCDEFGHIJ";
        let chunks = FixedChunker.chunk(text, &DecomposeOptions::with_size(10)).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "0123456789");
        assert_eq!(chunks[1].content, "ABCDEFGHIJ");
        assert_eq!((chunks[1].start_offset, chunks[1].end_offset), (10, 20));
    }

    #[test]
    fn test_fixed_chunker_with_overlap() {
        let text = "0123456789ABCDEFGHIJ";
        let chunks = FixedChunker
            .chunk(text, &DecomposeOptions::with_size_and_overlap(10, 3))
            .unwrap();
        assert_eq!(chunks[1].start_offset, 7);
        assert_eq!(chunks[1].content, "789ABCDEFG");
    }

    #[test]
    fn test_fixed_chunker_overlap_not_smaller_stops_after_first() {
        let text = "0123456789ABCDEFGHIJ";
        let chunks = FixedChunker
            .chunk(text, &DecomposeOptions::with_size_and_overlap(5, 5))
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "01234");

        let chunks = FixedChunker
            .chunk(text, &DecomposeOptions::with_size_and_overlap(5, 9))
            .unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_fixed_chunker_unicode_offsets_are_chars() {
        let text = "Hello世界Test";
        let chunks = FixedChunker.chunk(text, &DecomposeOptions::with_size(6)).unwrap();
        assert_eq!(chunks[0].content, "Hello世");
        assert_eq!(chunks[1].content, "界Test");
        assert_eq!((chunks[1].start_offset, chunks[1].end_offset), (6, 11));
    }

    #[test]
    fn test_fixed_chunker_huge_size_keeps_offsets_ordered() {
        let options = DecomposeOptions::with_size_and_overlap(usize::MAX, usize::MAX - 1);
        let chunks = FixedChunker.chunk("hello", &options).unwrap();
        assert_eq!(chunks[0].content, "hello");
        for chunk in &chunks {
            assert!(chunk.start_offset <= chunk.end_offset);
            assert!(chunk.end_offset <= 5);
        }
    }

    #[test]
    fn test_fixed_chunker_preserves_indices() {
        let text = "x".repeat(95);
        let chunks = FixedChunker.chunk(&text, &DecomposeOptions::with_size(10)).unwrap();
        assert_eq!(chunks.len(), 10);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_fixed_chunker_zero_size_rejected() {
        let result = FixedChunker.chunk("test", &DecomposeOptions::with_size(0));
        assert!(result.is_err());
    }

    #[test]
    fn test_fixed_chunker_name() {
        assert_eq!(FixedChunker.name(), "fixed_size");
    }
}
