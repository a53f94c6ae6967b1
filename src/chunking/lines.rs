//! Line-based chunking strategy.

use crate::chunking::traits::{Chunker, DecomposeOptions};
use crate::core::{Chunk, ChunkMetadata};
use crate::error::Result;
use crate::io::{char_len, split_lines};

/// Groups `lines_per_chunk` consecutive lines per chunk, advancing by
/// `max(1, lines_per_chunk - overlap)` lines.
///
/// Offsets are char offsets into the original text, accumulated from the
/// consumed line lengths plus one per newline.
///
/// # Examples
///
/// ```
/// use rlm_context::chunking::{Chunker, DecomposeOptions, LineChunker};
///
/// let chunks = LineChunker
///     .chunk("line1\nline2\nline3\nline4", &DecomposeOptions::with_lines(2, 0))
///     .unwrap();
/// assert_eq!(chunks[1].content, "line3\nline4");
/// assert_eq!((chunks[1].start_offset, chunks[1].end_offset), (12, 23));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LineChunker;

impl Chunker for LineChunker {
    fn chunk(&self, text: &str, options: &DecomposeOptions) -> Result<Vec<Chunk>> {
        DecomposeOptions::require_positive(options.lines_per_chunk, "lines_per_chunk")?;

        let lines = split_lines(text);
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        // Char offset where each line starts
        let mut line_starts = Vec::with_capacity(lines.len());
        let mut offset = 0;
        for line in &lines {
            line_starts.push(offset);
            offset += char_len(line) + 1;
        }

        let per_chunk = options.lines_per_chunk;
        let step = per_chunk.saturating_sub(options.overlap).max(1);
        let mut chunks = Vec::new();
        let mut first = 0;

        while first < lines.len() {
            let last = first.saturating_add(per_chunk).min(lines.len());
            let content = lines[first..last].join("\n");
            let start = line_starts[first];
            let end = start + char_len(&content);

            chunks.push(
                Chunk::new(chunks.len(), content, start, end).with_metadata(ChunkMetadata {
                    start_line: Some(first + 1),
                    end_line: Some(last),
                    ..ChunkMetadata::default()
                }),
            );

            if last >= lines.len() {
                break;
            }
            first += step;
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "by_lines"
    }

    fn description(&self) -> &'static str {
        "Consecutive line groups with line overlap"
    }
}
