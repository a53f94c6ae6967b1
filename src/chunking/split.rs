//! Separator-based chunking strategies: paragraphs, regex and sentences.
//!
//! All three track spans while splitting, so every chunk's offsets address
//! its trimmed content exactly, even when the same text repeats.

use crate::chunking::traits::{Chunker, DecomposeOptions};
use crate::core::Chunk;
use crate::error::{ChunkingError, Result};
use crate::io::CharIndex;
use regex::{Regex, RegexBuilder};

fn blank_lines_regex() -> &'static Regex {
    static_regex!(BLANK_LINES, r"\n\s*\n")
}

fn sentence_regex() -> &'static Regex {
    static_regex!(SENTENCE, r"[^.!?]+[.!?]+")
}

/// Returns the byte span of `text[start..end]` with surrounding whitespace
/// removed, or `None` when that slice is blank.
fn trimmed_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let segment = &text[start..end];
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = segment.len() - segment.trim_start().len();
    Some((start + lead, start + lead + trimmed.len()))
}

/// Byte spans of the non-blank, trimmed segments between separator matches.
fn segments_between(text: &str, separator: &Regex) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    for sep in separator.find_iter(text) {
        spans.extend(trimmed_span(text, cursor, sep.start()));
        cursor = sep.end();
    }
    spans.extend(trimmed_span(text, cursor, text.len()));
    spans
}

/// Builds indexed chunks from byte spans.
fn chunks_from_spans(text: &str, spans: &[(usize, usize)]) -> Vec<Chunk> {
    let index = CharIndex::new(text);
    spans
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| {
            Chunk::new(
                i,
                text[start..end].to_string(),
                index.char_offset(start),
                index.char_offset(end),
            )
        })
        .collect()
}

/// One chunk per paragraph, splitting on runs of blank lines.
///
/// # Examples
///
/// ```
/// use rlm_context::chunking::{Chunker, DecomposeOptions, ParagraphChunker};
///
/// let chunks = ParagraphChunker
///     .chunk("first\n\n\nsecond\n  \nthird", &DecomposeOptions::default())
///     .unwrap();
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[1].start_offset, 8);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ParagraphChunker;

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str, _options: &DecomposeOptions) -> Result<Vec<Chunk>> {
        let spans = segments_between(text, blank_lines_regex());
        Ok(chunks_from_spans(text, &spans))
    }

    fn name(&self) -> &'static str {
        "by_paragraphs"
    }

    fn description(&self) -> &'static str {
        "Paragraphs separated by blank lines"
    }
}

/// Splits on a caller-supplied regex; the separators are dropped.
///
/// The pattern is compiled in multi-line mode so `^` and `$` match at line
/// boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexChunker;

impl RegexChunker {
    fn compile(options: &DecomposeOptions) -> Result<Regex> {
        let pattern = options
            .pattern
            .as_deref()
            .ok_or_else(|| ChunkingError::InvalidConfig {
                reason: "pattern is required for by_regex".to_string(),
            })?;
        RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .map_err(|e| ChunkingError::from(e).into())
    }
}

impl Chunker for RegexChunker {
    fn chunk(&self, text: &str, options: &DecomposeOptions) -> Result<Vec<Chunk>> {
        let separator = Self::compile(options)?;
        let spans = segments_between(text, &separator);
        Ok(chunks_from_spans(text, &spans))
    }

    fn name(&self) -> &'static str {
        "by_regex"
    }

    fn description(&self) -> &'static str {
        "Segments between matches of a regex"
    }
}

/// One chunk per sentence: a run of non-terminators followed by `.`, `!`
/// or `?` runs.
///
/// A trailing fragment without a terminator is kept as the last chunk.
/// Non-empty text without any terminator is returned whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceChunker;

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str, _options: &DecomposeOptions) -> Result<Vec<Chunk>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut spans = Vec::new();
        let mut cursor = 0;
        for sentence in sentence_regex().find_iter(text) {
            spans.extend(trimmed_span(text, sentence.start(), sentence.end()));
            cursor = sentence.end();
        }

        if spans.is_empty() {
            return Ok(vec![Chunk::new(
                0,
                text.to_string(),
                0,
                CharIndex::new(text).char_len(),
            )]);
        }

        spans.extend(trimmed_span(text, cursor, text.len()));
        Ok(chunks_from_spans(text, &spans))
    }

    fn name(&self) -> &'static str {
        "by_sentences"
    }

    fn description(&self) -> &'static str {
        "Sentences ending in . ! or ?"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_paragraphs_split_and_drop_empty() {
        let text = "\n\nfirst para\nstill first\n\n\n\nsecond\n \t\nthird\n\n";
        let chunks = ParagraphChunker.chunk(text, &DecomposeOptions::default()).unwrap();
        assert_eq!(
            contents(&chunks),
            vec!["first para\nstill first", "second", "third"]
        );
    }

    #[test]
    fn test_paragraphs_repeated_text_offsets_exact() {
        let text = "same\n\nsame\n\nsame";
        let chunks = ParagraphChunker.chunk(text, &DecomposeOptions::default()).unwrap();
        let starts: Vec<_> = chunks.iter().map(|c| c.start_offset).collect();
        assert_eq!(starts, vec![0, 6, 12]);
    }

    #[test]
    fn test_paragraphs_empty() {
        let chunks = ParagraphChunker.chunk("", &DecomposeOptions::default()).unwrap();
        assert!(chunks.is_empty());
        let chunks = ParagraphChunker.chunk(" \n\n ", &DecomposeOptions::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_regex_split() {
        let text = "alpha\n---\nbeta\n---\ngamma";
        let chunks = RegexChunker
            .chunk(text, &DecomposeOptions::with_pattern("^---$"))
            .unwrap();
        assert_eq!(contents(&chunks), vec!["alpha", "beta", "gamma"]);
        assert_eq!(chunks[2].start_offset, 19);
        assert_eq!(chunks[2].end_offset, 24);
    }

    #[test]
    fn test_regex_requires_pattern() {
        let result = RegexChunker.chunk("text", &DecomposeOptions::default());
        assert!(matches!(
            result,
            Err(crate::Error::Chunking(ChunkingError::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn test_regex_invalid_pattern() {
        let result = RegexChunker.chunk("text", &DecomposeOptions::with_pattern("(unclosed"));
        assert!(matches!(
            result,
            Err(crate::Error::Chunking(ChunkingError::Regex(_)))
        ));
    }

    #[test]
    fn test_sentences() {
        let text = "Hello world. How are you?! Fine... thanks";
        let chunks = SentenceChunker.chunk(text, &DecomposeOptions::default()).unwrap();
        assert_eq!(
            contents(&chunks),
            vec!["Hello world.", "How are you?!", "Fine...", "thanks"]
        );
        assert_eq!(chunks[1].start_offset, 13);
    }

    #[test]
    fn test_sentences_without_terminator_is_whole_text() {
        let text = "no terminator here";
        let chunks = SentenceChunker.chunk(text, &DecomposeOptions::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn test_sentences_empty() {
        let chunks = SentenceChunker.chunk("", &DecomposeOptions::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_sentences_unicode_offsets() {
        let text = "Ünïcode first. Second.";
        let chunks = SentenceChunker.chunk(text, &DecomposeOptions::default()).unwrap();
        assert_eq!(chunks[1].start_offset, 15);
        assert_eq!(chunks[1].end_offset, 22);
    }
}
