//! Markdown section chunking strategy.

use crate::chunking::traits::{Chunker, DecomposeOptions};
use crate::core::{Chunk, ChunkMetadata};
use crate::error::Result;
use crate::io::CharIndex;
use regex::Regex;

/// Line-anchored ATX heading: 1-6 `#` then blanks then a title.
fn heading_regex() -> &'static Regex {
    static_regex!(HEADING, r"(?m)^(#{1,6})[ \t]+(\S[^\n]*)$")
}

/// Splits Markdown at headings.
///
/// Each heading starts a chunk that runs to the next heading or the end of
/// the text. Non-blank text before the first heading becomes a leading
/// preamble chunk. Text without headings is returned whole as one chunk,
/// including the empty text.
///
/// # Examples
///
/// ```
/// use rlm_context::chunking::{Chunker, DecomposeOptions, SectionChunker};
///
/// let text = "intro\n# One\nbody\n## Two\nmore";
/// let chunks = SectionChunker.chunk(text, &DecomposeOptions::default()).unwrap();
/// assert_eq!(chunks.len(), 3);
/// assert!(chunks[0].metadata.as_ref().unwrap().preamble);
/// assert_eq!(chunks[2].content, "## Two\nmore");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionChunker;

impl Chunker for SectionChunker {
    fn chunk(&self, text: &str, _options: &DecomposeOptions) -> Result<Vec<Chunk>> {
        let index = CharIndex::new(text);
        let headings: Vec<_> = heading_regex().captures_iter(text).collect();

        if headings.is_empty() {
            return Ok(vec![Chunk::new(0, text.to_string(), 0, index.char_len())]);
        }

        let mut chunks = Vec::with_capacity(headings.len() + 1);

        let first_start = headings[0].get(0).map_or(0, |m| m.start());
        let preamble = &text[..first_start];
        if !preamble.trim().is_empty() {
            chunks.push(
                Chunk::new(0, preamble.to_string(), 0, index.char_offset(first_start))
                    .with_metadata(ChunkMetadata {
                        preamble: true,
                        ..ChunkMetadata::default()
                    }),
            );
        }

        for (i, caps) in headings.iter().enumerate() {
            let start = caps.get(0).map_or(0, |m| m.start());
            let end = headings
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let level = caps.get(1).map_or(0, |m| m.as_str().len());
            let title = caps.get(2).map_or("", |m| m.as_str()).trim();

            chunks.push(
                Chunk::new(
                    chunks.len(),
                    text[start..end].to_string(),
                    index.char_offset(start),
                    index.char_offset(end),
                )
                .with_metadata(ChunkMetadata {
                    heading_level: Some(level),
                    heading_title: Some(title.to_string()),
                    ..ChunkMetadata::default()
                }),
            );
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "by_sections"
    }

    fn description(&self) -> &'static str {
        "Markdown sections split at headings"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Vec<Chunk> {
        SectionChunker.chunk(text, &DecomposeOptions::default()).unwrap()
    }

    #[test]
    fn test_sections_no_headers_is_whole_text() {
        let text = "just some prose\nwithout headings";
        let chunks = chunk(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert!(chunks[0].metadata.is_none());
    }

    #[test]
    fn test_sections_empty_text() {
        let chunks = chunk("");
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].start_offset, chunks[0].end_offset), (0, 0));
    }

    #[test]
    fn test_sections_metadata() {
        let text = "# Title\nintro\n### Deep  \ndetail\n";
        let chunks = chunk(text);
        assert_eq!(chunks.len(), 2);

        let first = chunks[0].metadata.as_ref().unwrap();
        assert_eq!(first.heading_level, Some(1));
        assert_eq!(first.heading_title.as_deref(), Some("Title"));
        assert!(!first.preamble);

        let second = chunks[1].metadata.as_ref().unwrap();
        assert_eq!(second.heading_level, Some(3));
        assert_eq!(second.heading_title.as_deref(), Some("Deep"));
        assert_eq!(chunks[1].content, "### Deep  \ndetail\n");
        assert_eq!(chunks[1].end_offset, text.len());
    }

    #[test]
    fn test_sections_blank_preamble_skipped() {
        let chunks = chunk("\n\n# A\nx");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].start_offset, 2);
    }

    #[test]
    fn test_sections_ignore_non_headings() {
        let chunks = chunk("#hashtag\n####### seven\n text # inline");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].metadata.is_none());
    }

    #[test]
    fn test_sections_cover_text_contiguously() {
        let text = "pre\n# A\na\n## B\nb\n# C\nc";
        let chunks = chunk(text);
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined, text);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_offset, pair[1].start_offset);
        }
    }
}
