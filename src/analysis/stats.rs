//! Aggregate text statistics and strategy suggestion.

use crate::chunking::{DecomposeOptions, Strategy};
use crate::core::Structure;
use crate::io::{char_len, split_lines};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Paragraph count above which plain text is split by paragraphs.
const PARAGRAPH_THRESHOLD: usize = 10;

/// Length (chars) above which plain text falls back to fixed-size windows.
const LARGE_TEXT_THRESHOLD: usize = 50_000;

fn sentence_split_regex() -> &'static Regex {
    static_regex!(SENTENCE_SPLIT, r"[.!?]+")
}

fn paragraph_split_regex() -> &'static Regex {
    static_regex!(PARAGRAPH_SPLIT, r"\n\s*\n")
}

/// Simple split-based statistics over a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStatistics {
    /// Length in chars.
    pub length: usize,
    /// Line count.
    pub line_count: usize,
    /// Whitespace-delimited word count.
    pub word_count: usize,
    /// Non-empty segments between `.`, `!` and `?` runs.
    pub sentence_count: usize,
    /// Non-empty blocks between blank-line runs.
    pub paragraph_count: usize,
    /// Mean line length in chars, rounded.
    pub avg_line_length: usize,
    /// Mean word length in chars, rounded.
    pub avg_word_length: usize,
}

/// Computes [`TextStatistics`] for `text`.
///
/// # Examples
///
/// ```
/// use rlm_context::analysis::compute_statistics;
///
/// let stats = compute_statistics("One two. Three!\n\nFour");
/// assert_eq!(stats.word_count, 4);
/// assert_eq!(stats.sentence_count, 3);
/// assert_eq!(stats.paragraph_count, 2);
/// ```
#[must_use]
pub fn compute_statistics(text: &str) -> TextStatistics {
    let lines = split_lines(text);
    let words: Vec<&str> = text.split_whitespace().collect();

    let sentence_count = sentence_split_regex()
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count();
    let paragraph_count = paragraph_split_regex()
        .split(text)
        .filter(|p| !p.trim().is_empty())
        .count();

    let line_chars: usize = lines.iter().map(|l| char_len(l)).sum();
    let word_chars: usize = words.iter().map(|w| char_len(w)).sum();

    TextStatistics {
        length: char_len(text),
        line_count: lines.len(),
        word_count: words.len(),
        sentence_count,
        paragraph_count,
        avg_line_length: rounded_mean(line_chars, lines.len()),
        avg_word_length: rounded_mean(word_chars, words.len()),
    }
}

/// Rounded integer mean; zero when there is nothing to average.
const fn rounded_mean(total: usize, count: usize) -> usize {
    if count == 0 {
        0
    } else {
        (total + count / 2) / count
    }
}

/// A recommended strategy with its options and the reason for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySuggestion {
    /// Structure the suggestion was made for.
    pub structure: Structure,
    /// Recommended strategy.
    pub strategy: Strategy,
    /// Options to decompose with.
    pub options: DecomposeOptions,
    /// Human-readable rationale.
    pub rationale: String,
}

/// Suggests a decomposition strategy for `text` of the given structure.
///
/// The result is deterministic for identical input.
///
/// | Structure | Strategy |
/// |---|---|
/// | JSON | `fixed_size` 20 000 / overlap 500 |
/// | CSV | `by_lines` 500, no overlap |
/// | Markdown | `by_sections` |
/// | Code | `by_lines` 100 / overlap 10 |
/// | Log | `by_lines` 1 000, no overlap |
/// | other | `by_paragraphs` if more than 10 paragraphs, `fixed_size` if longer than 50 000 chars, else `by_sentences` |
///
/// # Examples
///
/// ```
/// use rlm_context::analysis::suggest_strategy;
/// use rlm_context::chunking::Strategy;
/// use rlm_context::core::Structure;
///
/// let suggestion = suggest_strategy("# A\ntext", Structure::Markdown);
/// assert_eq!(suggestion.strategy, Strategy::BySections);
/// ```
#[must_use]
pub fn suggest_strategy(text: &str, structure: Structure) -> StrategySuggestion {
    let (strategy, options, rationale) = match structure {
        Structure::Json => (
            Strategy::FixedSize,
            DecomposeOptions::with_size_and_overlap(20_000, 500),
            "large fixed windows avoid breaking structure",
        ),
        Structure::Csv => (
            Strategy::ByLines,
            DecomposeOptions::with_lines(500, 0),
            "line groups without overlap keep rows intact",
        ),
        Structure::Markdown => (
            Strategy::BySections,
            DecomposeOptions::default(),
            "headings give natural section boundaries",
        ),
        Structure::Code => (
            Strategy::ByLines,
            DecomposeOptions::with_lines(100, 10),
            "line groups with a small overlap keep definitions readable",
        ),
        Structure::Log => (
            Strategy::ByLines,
            DecomposeOptions::with_lines(1_000, 0),
            "large line groups keep log entries together",
        ),
        Structure::Plain => {
            let stats = compute_statistics(text);
            if stats.paragraph_count > PARAGRAPH_THRESHOLD {
                (
                    Strategy::ByParagraphs,
                    DecomposeOptions::default(),
                    "many paragraphs give natural boundaries",
                )
            } else if stats.length > LARGE_TEXT_THRESHOLD {
                (
                    Strategy::FixedSize,
                    DecomposeOptions::with_size_and_overlap(10_000, 500),
                    "long unstructured text is windowed with overlap",
                )
            } else {
                (
                    Strategy::BySentences,
                    DecomposeOptions::default(),
                    "short unstructured text splits by sentence",
                )
            }
        }
    };

    StrategySuggestion {
        structure,
        strategy,
        options,
        rationale: rationale.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_statistics_basic() {
        let text = "Hello world. Second sentence!\n\nNew paragraph here?\n";
        let stats = compute_statistics(text);
        assert_eq!(stats.length, text.chars().count());
        assert_eq!(stats.line_count, 3);
        assert_eq!(stats.word_count, 7);
        assert_eq!(stats.sentence_count, 3);
        assert_eq!(stats.paragraph_count, 2);
    }

    #[test]
    fn test_statistics_empty() {
        let stats = compute_statistics("");
        assert_eq!(stats.length, 0);
        assert_eq!(stats.line_count, 0);
        assert_eq!(stats.word_count, 0);
        assert_eq!(stats.sentence_count, 0);
        assert_eq!(stats.paragraph_count, 0);
        assert_eq!(stats.avg_line_length, 0);
        assert_eq!(stats.avg_word_length, 0);
    }

    #[test]
    fn test_statistics_averages_round() {
        // Words of 1 and 2 chars average 1.5, which rounds up.
        let stats = compute_statistics("a bb");
        assert_eq!(stats.avg_word_length, 2);
        assert_eq!(stats.avg_line_length, 4);
    }

    #[test_case(Structure::Json, Strategy::FixedSize ; "json")]
    #[test_case(Structure::Csv, Strategy::ByLines ; "csv")]
    #[test_case(Structure::Markdown, Strategy::BySections ; "markdown")]
    #[test_case(Structure::Code, Strategy::ByLines ; "code")]
    #[test_case(Structure::Log, Strategy::ByLines ; "log")]
    #[test_case(Structure::Plain, Strategy::BySentences ; "short plain")]
    fn test_suggest_by_structure(structure: Structure, expected: Strategy) {
        let suggestion = suggest_strategy("Some short text.", structure);
        assert_eq!(suggestion.strategy, expected);
        assert_eq!(suggestion.structure, structure);
    }

    #[test]
    fn test_suggest_json_rationale() {
        let suggestion = suggest_strategy("{}", Structure::Json);
        assert!(suggestion.rationale.contains("avoid breaking structure"));
        assert_eq!(suggestion.options.chunk_size, 20_000);
        assert_eq!(suggestion.options.overlap, 500);
    }

    #[test]
    fn test_suggest_plain_many_paragraphs() {
        let text = "para\n\n".repeat(11);
        let suggestion = suggest_strategy(&text, Structure::Plain);
        assert_eq!(suggestion.strategy, Strategy::ByParagraphs);
    }

    #[test]
    fn test_suggest_plain_large_text() {
        let text = "x".repeat(LARGE_TEXT_THRESHOLD + 1);
        let suggestion = suggest_strategy(&text, Structure::Plain);
        assert_eq!(suggestion.strategy, Strategy::FixedSize);
    }

    #[test]
    fn test_suggest_is_deterministic() {
        let text = "alpha. beta.\n\ngamma";
        assert_eq!(
            suggest_strategy(text, Structure::Plain),
            suggest_strategy(text, Structure::Plain)
        );
    }
}
