//! Decomposition strategies.
//!
//! This module provides a trait-based system for decomposing a context into
//! ordered, offset-exact chunks. Six strategies are available:
//!
//! - **`fixed_size`**: char windows with overlap
//! - **`by_lines`**: groups of lines with line overlap
//! - **`by_paragraphs`**: blocks separated by blank lines
//! - **`by_sections`**: Markdown sections split at headings
//! - **`by_regex`**: segments between matches of a caller pattern
//! - **`by_sentences`**: sentences ending in `.`, `!` or `?`
//!
//! Decomposition is deterministic and side-effect free; chunk indices are
//! only meaningful for the `(strategy, options)` pair that produced them.

pub mod fixed;
pub mod lines;
pub mod sections;
pub mod split;
pub mod traits;

pub use fixed::FixedChunker;
pub use lines::LineChunker;
pub use sections::SectionChunker;
pub use split::{ParagraphChunker, RegexChunker, SentenceChunker};
pub use traits::{Chunker, DecomposeOptions};

use crate::core::Chunk;
use crate::error::{ChunkingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default chunk size in chars for fixed-size decomposition.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Default overlap between fixed-size chunks.
pub const DEFAULT_OVERLAP: usize = 0;

/// Default lines per chunk for line decomposition.
pub const DEFAULT_LINES_PER_CHUNK: usize = 100;

/// A named decomposition algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Fixed-size char windows with overlap.
    #[default]
    FixedSize,
    /// Line groups with line overlap.
    ByLines,
    /// Paragraphs separated by blank lines.
    ByParagraphs,
    /// Markdown sections.
    BySections,
    /// Segments between regex matches.
    ByRegex,
    /// Sentences.
    BySentences,
}

impl Strategy {
    /// All strategies, in documentation order.
    pub const ALL: [Self; 6] = [
        Self::FixedSize,
        Self::ByLines,
        Self::ByParagraphs,
        Self::BySections,
        Self::ByRegex,
        Self::BySentences,
    ];

    /// Returns the strategy's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FixedSize => "fixed_size",
            Self::ByLines => "by_lines",
            Self::ByParagraphs => "by_paragraphs",
            Self::BySections => "by_sections",
            Self::ByRegex => "by_regex",
            Self::BySentences => "by_sentences",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = crate::error::Error;

    /// Parses a strategy name, accepting `-`/`_` and the short forms
    /// (`fixed`, `lines`, `paragraphs`, `sections`, `regex`, `sentences`).
    fn from_str(name: &str) -> Result<Self> {
        let normalized = name.trim().to_lowercase().replace('-', "_");
        let strategy = match normalized.as_str() {
            "fixed_size" | "fixed" => Self::FixedSize,
            "by_lines" | "lines" => Self::ByLines,
            "by_paragraphs" | "paragraphs" => Self::ByParagraphs,
            "by_sections" | "sections" => Self::BySections,
            "by_regex" | "regex" => Self::ByRegex,
            "by_sentences" | "sentences" => Self::BySentences,
            _ => {
                return Err(ChunkingError::UnknownStrategy {
                    name: name.to_string(),
                }
                .into());
            }
        };
        Ok(strategy)
    }
}

/// Creates the chunker implementing a strategy.
#[must_use]
pub fn create_chunker(strategy: Strategy) -> Box<dyn Chunker> {
    match strategy {
        Strategy::FixedSize => Box::new(FixedChunker),
        Strategy::ByLines => Box::new(LineChunker),
        Strategy::ByParagraphs => Box::new(ParagraphChunker),
        Strategy::BySections => Box::new(SectionChunker),
        Strategy::ByRegex => Box::new(RegexChunker),
        Strategy::BySentences => Box::new(SentenceChunker),
    }
}

/// Decomposes `text` with the given strategy.
///
/// # Errors
///
/// Returns an error for invalid options (zero sizes, missing or malformed
/// regex pattern).
///
/// # Examples
///
/// ```
/// use rlm_context::chunking::{DecomposeOptions, Strategy, decompose};
///
/// let chunks = decompose("a. b. c.", Strategy::BySentences, &DecomposeOptions::default()).unwrap();
/// assert_eq!(chunks.len(), 3);
/// ```
pub fn decompose(text: &str, strategy: Strategy, options: &DecomposeOptions) -> Result<Vec<Chunk>> {
    let chunks = create_chunker(strategy).chunk(text, options)?;
    tracing::debug!(
        strategy = strategy.as_str(),
        chunks = chunks.len(),
        "decomposed text"
    );
    Ok(chunks)
}

/// Lists available strategy names.
#[must_use]
pub fn available_strategies() -> Vec<&'static str> {
    Strategy::ALL.iter().map(|s| s.as_str()).collect()
}

/// Name and one-line description of a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyInfo {
    /// Strategy name as accepted by `decompose_context`.
    pub name: &'static str,
    /// What the strategy splits on.
    pub description: &'static str,
}

/// Describes every strategy, in [`Strategy::ALL`] order.
#[must_use]
pub fn strategy_catalog() -> Vec<StrategyInfo> {
    Strategy::ALL
        .iter()
        .map(|&strategy| {
            let chunker = create_chunker(strategy);
            StrategyInfo {
                name: chunker.name(),
                description: chunker.description(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse() {
        assert_eq!("fixed_size".parse::<Strategy>().unwrap(), Strategy::FixedSize);
        assert_eq!("by-lines".parse::<Strategy>().unwrap(), Strategy::ByLines);
        assert_eq!("PARAGRAPHS".parse::<Strategy>().unwrap(), Strategy::ByParagraphs);
        assert_eq!("sections".parse::<Strategy>().unwrap(), Strategy::BySections);
        assert_eq!("regex".parse::<Strategy>().unwrap(), Strategy::ByRegex);
        assert_eq!("by_sentences".parse::<Strategy>().unwrap(), Strategy::BySentences);
        assert!("semantic".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_create_chunker_names_match_strategy() {
        for strategy in Strategy::ALL {
            assert_eq!(create_chunker(strategy).name(), strategy.as_str());
        }
    }

    #[test]
    fn test_available_strategies() {
        let strategies = available_strategies();
        assert_eq!(strategies.len(), 6);
        assert!(strategies.contains(&"by_sections"));
    }

    #[test]
    fn test_strategy_catalog_describes_each_strategy() {
        let catalog = strategy_catalog();
        let names: Vec<_> = catalog.iter().map(|info| info.name).collect();
        assert_eq!(names, available_strategies());
        for info in &catalog {
            assert!(!info.description.is_empty());
            assert_ne!(info.description, "No description available", "{}", info.name);
        }
    }

    #[test]
    fn test_strategy_serde_names() {
        let json = serde_json::to_string(&Strategy::ByParagraphs).unwrap();
        assert_eq!(json, "\"by_paragraphs\"");
        let parsed: Strategy = serde_json::from_str("\"by_regex\"").unwrap();
        assert_eq!(parsed, Strategy::ByRegex);
    }

    #[test]
    fn test_decompose_is_idempotent() {
        let text = "# A\none\n\n# B\ntwo. three!\n".repeat(5);
        for strategy in Strategy::ALL {
            let opts = DecomposeOptions {
                chunk_size: 7,
                overlap: 2,
                lines_per_chunk: 3,
                pattern: Some("\n".to_string()),
            };
            let first = decompose(&text, strategy, &opts).unwrap();
            let second = decompose(&text, strategy, &opts).unwrap();
            assert_eq!(first, second, "strategy {strategy}");
        }
    }

    #[test]
    fn test_empty_text_per_strategy() {
        let opts = DecomposeOptions::with_pattern(",");
        for strategy in Strategy::ALL {
            let chunks = decompose("", strategy, &opts).unwrap();
            let expected = usize::from(strategy == Strategy::BySections);
            assert_eq!(chunks.len(), expected, "strategy {strategy}");
        }
    }
}
