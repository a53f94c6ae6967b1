//! Loaded contexts.
//!
//! A context is a named block of text held by a session. Its content is
//! shared behind an `Arc` so decomposition, search and the script sandbox
//! can read it without copying, and replacing a context swaps the whole
//! value at once.

use crate::analysis::detect_structure;
use crate::io::{char_len, split_lines};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Coarse content classification driving strategy suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Structure {
    /// JSON document (leading brace or bracket).
    Json,
    /// Comma-separated rows.
    Csv,
    /// Markdown with headers.
    Markdown,
    /// Source code.
    Code,
    /// Timestamped or levelled log lines.
    Log,
    /// Anything else.
    Plain,
}

impl Structure {
    /// Returns the lowercase tag name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Markdown => "markdown",
            Self::Code => "code",
            Self::Log => "log",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata computed once when a context is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    /// Length in chars.
    pub length: usize,
    /// Number of lines (a trailing newline does not open a new line).
    pub line_count: usize,
    /// Number of whitespace-delimited words.
    pub word_count: usize,
    /// Detected structure tag.
    pub structure: Structure,
}

impl ContextMetadata {
    /// Computes metadata for `content`.
    #[must_use]
    pub fn compute(content: &str) -> Self {
        Self {
            length: char_len(content),
            line_count: split_lines(content).len(),
            word_count: content.split_whitespace().count(),
            structure: detect_structure(content),
        }
    }
}

/// A named block of loaded text.
///
/// # Examples
///
/// ```
/// use rlm_context::core::{Context, Structure};
///
/// let ctx = Context::new("notes", "# Title\n\nSome body text.");
/// assert_eq!(ctx.metadata.structure, Structure::Markdown);
/// assert_eq!(ctx.metadata.line_count, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Context id, unique within its session.
    pub id: String,
    /// Loaded text.
    #[serde(skip)]
    pub content: Arc<str>,
    /// Unix timestamp (milliseconds) when the context was loaded.
    pub created_at: i64,
    /// Computed metadata.
    pub metadata: ContextMetadata,
}

impl Context {
    /// Creates a context, computing its metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let metadata = ContextMetadata::compute(&content);
        Self {
            id: id.into(),
            content,
            created_at: current_timestamp_ms(),
            metadata,
        }
    }

    /// Returns the content as a string slice.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.content
    }
}

/// Returns the current Unix timestamp in milliseconds.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn current_timestamp_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_metadata() {
        let ctx = Context::new("doc", "alpha beta\ngamma\n");
        assert_eq!(ctx.metadata.length, 17);
        assert_eq!(ctx.metadata.line_count, 2);
        assert_eq!(ctx.metadata.word_count, 3);
        assert_eq!(ctx.metadata.structure, Structure::Plain);
        assert!(ctx.created_at > 0);
    }

    #[test]
    fn test_context_metadata_counts_chars() {
        let ctx = Context::new("doc", "héllo wörld");
        assert_eq!(ctx.metadata.length, 11);
    }

    #[test]
    fn test_empty_context() {
        let ctx = Context::new("empty", "");
        assert_eq!(ctx.metadata.length, 0);
        assert_eq!(ctx.metadata.line_count, 0);
        assert_eq!(ctx.metadata.word_count, 0);
    }

    #[test]
    fn test_structure_serializes_lowercase() {
        let json = serde_json::to_string(&Structure::Markdown).unwrap();
        assert_eq!(json, "\"markdown\"");
        assert_eq!(Structure::Csv.to_string(), "csv");
    }

    #[test]
    fn test_context_serialization_omits_content() {
        let ctx = Context::new("doc", "secret body");
        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["metadata"]["wordCount"], 2);
    }
}
