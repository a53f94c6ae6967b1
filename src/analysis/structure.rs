//! Structure detection from superficial signals.
//!
//! Only a bounded sample of leading lines is inspected, so detection cost
//! does not grow with the context.

use crate::core::Structure;
use regex::Regex;

/// Number of non-empty leading lines inspected.
const SAMPLE_LINES: usize = 50;

fn log_line_regex() -> &'static Regex {
    static_regex!(
        LOG_LINE,
        r"^\[?\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}|^\S*\s*\[?(TRACE|DEBUG|INFO|WARN|WARNING|ERROR|FATAL)\]?[\s:]"
    )
}

fn code_line_regex() -> &'static Regex {
    static_regex!(
        CODE_LINE,
        r"^\s*(fn|pub|impl|use|mod|struct|enum|def|class|import|from\s+\S+\s+import|function|const|let|var|return|package|public|private|#include|#!)\b|[;{}]\s*$"
    )
}

fn heading_regex() -> &'static Regex {
    static_regex!(MD_HEADING, r"^#{1,6}\s+\S")
}

/// Classifies text into a [`Structure`].
///
/// Checks run in order: JSON (leading brace/bracket), log lines, CSV
/// (consistent comma count), code, Markdown (headings or fences), plain.
///
/// # Examples
///
/// ```
/// use rlm_context::analysis::detect_structure;
/// use rlm_context::core::Structure;
///
/// assert_eq!(detect_structure("  {\"a\": 1}"), Structure::Json);
/// assert_eq!(detect_structure("id,name\n1,ann\n2,bob"), Structure::Csv);
/// assert_eq!(detect_structure("just words"), Structure::Plain);
/// ```
#[must_use]
pub fn detect_structure(text: &str) -> Structure {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Structure::Json;
    }

    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();
    if sample.is_empty() {
        return Structure::Plain;
    }

    let ratio = |count: usize| fraction(count, sample.len());

    let log_lines = sample.iter().filter(|l| log_line_regex().is_match(l)).count();
    if ratio(log_lines) >= 0.5 {
        return Structure::Log;
    }

    if looks_like_csv(&sample) {
        return Structure::Csv;
    }

    let headings = sample.iter().filter(|l| heading_regex().is_match(l)).count();
    let fences = sample
        .iter()
        .filter(|l| l.trim_start().starts_with("```"))
        .count();
    let code_lines = sample
        .iter()
        .filter(|l| !heading_regex().is_match(l) && code_line_regex().is_match(l))
        .count();

    if ratio(code_lines) >= 0.3 && fences == 0 {
        return Structure::Code;
    }
    if headings > 0 || fences >= 2 {
        return Structure::Markdown;
    }
    Structure::Plain
}

#[allow(clippy::cast_precision_loss)]
fn fraction(count: usize, total: usize) -> f64 {
    count as f64 / total as f64
}

/// At least two lines whose comma counts mostly match a non-zero header count.
fn looks_like_csv(sample: &[&str]) -> bool {
    if sample.len() < 2 {
        return false;
    }
    let header_commas = sample[0].matches(',').count();
    if header_commas == 0 {
        return false;
    }
    let consistent = sample
        .iter()
        .filter(|line| line.matches(',').count() == header_commas)
        .count();
    consistent * 5 >= sample.len() * 4
}
