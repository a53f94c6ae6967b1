//! Chunker trait definition.
//!
//! Defines the interface for all decomposition strategies, enabling
//! pluggable text segmentation approaches.

use crate::core::Chunk;
use crate::error::{ChunkingError, Result};
use serde::{Deserialize, Serialize};

/// Trait for decomposing text into offset-addressed chunks.
///
/// Implementations are pure: the same text and options always produce the
/// same chunks, in non-decreasing `start_offset` order, indexed from zero.
///
/// # Examples
///
/// ```
/// use rlm_context::chunking::{Chunker, DecomposeOptions, FixedChunker};
///
/// let chunks = FixedChunker
///     .chunk("Hello, world! ".repeat(20).as_str(), &DecomposeOptions::with_size(100))
///     .unwrap();
/// assert_eq!(chunks.len(), 3);
/// ```
pub trait Chunker: Send + Sync {
    /// Decomposes the input text into chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid for this strategy.
    fn chunk(&self, text: &str, options: &DecomposeOptions) -> Result<Vec<Chunk>>;

    /// Returns the name of the strategy.
    fn name(&self) -> &'static str;

    /// Returns a description of the strategy.
    fn description(&self) -> &'static str {
        "No description available"
    }
}

/// Parameters shared by all strategies; each reads the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecomposeOptions {
    /// Chunk size in chars (fixed-size).
    pub chunk_size: usize,

    /// Overlap between consecutive chunks: chars for fixed-size, lines for
    /// by-lines.
    pub overlap: usize,

    /// Lines per chunk (by-lines).
    pub lines_per_chunk: usize,

    /// Split pattern (by-regex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Default for DecomposeOptions {
    fn default() -> Self {
        Self {
            chunk_size: super::DEFAULT_CHUNK_SIZE,
            overlap: super::DEFAULT_OVERLAP,
            lines_per_chunk: super::DEFAULT_LINES_PER_CHUNK,
            pattern: None,
        }
    }
}

impl DecomposeOptions {
    /// Creates options with a custom chunk size and no overlap.
    #[must_use]
    pub fn with_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            overlap: 0,
            ..Self::default()
        }
    }

    /// Creates options with custom size and overlap.
    #[must_use]
    pub fn with_size_and_overlap(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            ..Self::default()
        }
    }

    /// Creates by-lines options.
    #[must_use]
    pub fn with_lines(lines_per_chunk: usize, overlap_lines: usize) -> Self {
        Self {
            lines_per_chunk,
            overlap: overlap_lines,
            ..Self::default()
        }
    }

    /// Creates by-regex options.
    #[must_use]
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub(crate) fn require_positive(value: usize, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ChunkingError::InvalidConfig {
                reason: format!("{field} must be > 0"),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let opts = DecomposeOptions::default();
        assert_eq!(opts.chunk_size, super::super::DEFAULT_CHUNK_SIZE);
        assert_eq!(opts.lines_per_chunk, super::super::DEFAULT_LINES_PER_CHUNK);
        assert!(opts.pattern.is_none());
    }

    #[test]
    fn test_options_builders() {
        let opts = DecomposeOptions::with_size_and_overlap(1000, 100);
        assert_eq!((opts.chunk_size, opts.overlap), (1000, 100));

        let opts = DecomposeOptions::with_lines(50, 5);
        assert_eq!((opts.lines_per_chunk, opts.overlap), (50, 5));

        let opts = DecomposeOptions::with_pattern("---");
        assert_eq!(opts.pattern.as_deref(), Some("---"));
    }

    #[test]
    fn test_require_positive() {
        assert!(DecomposeOptions::require_positive(1, "chunk_size").is_ok());
        let err = DecomposeOptions::require_positive(0, "chunk_size").unwrap_err();
        assert!(err.to_string().contains("chunk_size must be > 0"));
    }

    /// A minimal chunker that uses all default trait implementations
    struct MinimalChunker;

    impl Chunker for MinimalChunker {
        fn chunk(&self, _text: &str, _options: &DecomposeOptions) -> Result<Vec<Chunk>> {
            Ok(vec![])
        }

        fn name(&self) -> &'static str {
            "minimal"
        }
    }

    #[test]
    fn test_chunker_default_description() {
        assert_eq!(MinimalChunker.description(), "No description available");
    }
}
