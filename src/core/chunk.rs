//! Chunk representation.
//!
//! Chunks are offset-addressed slices of a context produced by one
//! decomposition run. A chunk's identity is `(strategy, options, index)`:
//! indices are contiguous from zero within a run and carry no meaning
//! across runs with different parameters.

use serde::{Deserialize, Serialize};

/// Represents one chunk of a decomposed text.
///
/// Offsets are char offsets into the source text and satisfy
/// `start_offset <= end_offset <= len(source)`.
///
/// # Examples
///
/// ```
/// use rlm_context::core::Chunk;
///
/// let chunk = Chunk::new(0, "Hello".to_string(), 0, 5);
/// assert_eq!(chunk.len(), 5);
/// assert!(chunk.metadata.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Sequential index within the decomposition run (0-based).
    pub index: usize,

    /// Chunk content.
    pub content: String,

    /// Start char offset in the source text.
    pub start_offset: usize,

    /// End char offset (exclusive) in the source text.
    pub end_offset: usize,

    /// Strategy-specific metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChunkMetadata>,
}

/// Strategy-specific chunk metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// First line covered (1-based), for line-based chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,

    /// Last line covered (1-based, inclusive), for line-based chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,

    /// Markdown heading level (1-6), for section chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<usize>,

    /// Markdown heading title, for section chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_title: Option<String>,

    /// Set on the section chunk holding text before the first heading.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub preamble: bool,
}

impl Chunk {
    /// Creates a chunk without metadata.
    #[must_use]
    pub const fn new(index: usize, content: String, start_offset: usize, end_offset: usize) -> Self {
        Self {
            index,
            content,
            start_offset,
            end_offset,
            metadata: None,
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns the offset span length in chars.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    /// Checks if the chunk spans no text.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }

    /// Checks if this chunk's span contains a char offset.
    #[must_use]
    pub const fn contains_offset(&self, offset: usize) -> bool {
        self.start_offset <= offset && offset < self.end_offset
    }
}
