//! Regex and substring search over loaded text.
//!
//! Both searches return char offsets into the searched text. Patterns are
//! compiled per call; an invalid pattern is always reported as
//! [`SearchError::InvalidPattern`], never as an empty result.

use crate::error::{Result, SearchError};
use crate::io::CharIndex;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Default context window, in chars, on each side of a match.
pub const DEFAULT_CONTEXT_CHARS: usize = 100;

/// Default maximum number of matches returned.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Options for [`search`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Regex flags: `i`, `m`, `s`, `x`. `g` and `u` are accepted and ignored.
    pub flags: String,
    /// Chars of surrounding text kept on each side of a match.
    pub context_chars: usize,
    /// Maximum number of matches returned.
    pub max_results: usize,
    /// Whether to compute 1-based line numbers.
    pub include_line_numbers: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            flags: String::new(),
            context_chars: DEFAULT_CONTEXT_CHARS,
            max_results: DEFAULT_MAX_RESULTS,
            include_line_numbers: true,
        }
    }
}

/// One regex match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    /// Matched text.
    #[serde(rename = "match")]
    pub match_text: String,
    /// Char offset of the match start.
    pub index: usize,
    /// 1-based line of the match start, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    /// Match plus up to `context_chars` on each side.
    pub context: String,
    /// Capture groups in order; groups that did not participate are empty.
    pub groups: Vec<String>,
}

/// Compiles `pattern` with single-letter `flags`.
///
/// # Errors
///
/// Returns [`SearchError::InvalidFlag`] for an unsupported flag and
/// [`SearchError::InvalidPattern`] when the pattern does not compile.
pub fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'g' | 'u' => &mut builder,
            other => return Err(SearchError::InvalidFlag { flag: other }.into()),
        };
    }
    builder.build().map_err(|e| SearchError::from(e).into())
}

/// Searches `text` for `pattern`, in ascending match order.
///
/// Zero-length matches are reported once and the scan moves past them.
///
/// # Errors
///
/// Returns an error if the pattern or flags are invalid.
///
/// # Examples
///
/// ```
/// use rlm_context::search::{SearchOptions, search};
///
/// let matches = search("alpha\nbeta\ngamma", r"b(e)ta", &SearchOptions::default()).unwrap();
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches[0].index, 6);
/// assert_eq!(matches[0].line_number, Some(2));
/// assert_eq!(matches[0].groups, vec!["e".to_string()]);
/// ```
pub fn search(text: &str, pattern: &str, options: &SearchOptions) -> Result<Vec<SearchMatch>> {
    let regex = compile_pattern(pattern, &options.flags)?;
    let index = CharIndex::new(text);
    let total_chars = index.char_len();

    let mut matches = Vec::new();
    let mut line = 1;
    let mut line_cursor = 0;

    for caps in regex.captures_iter(text) {
        if matches.len() >= options.max_results {
            break;
        }
        let Some(whole) = caps.get(0) else {
            continue;
        };

        let start = index.char_offset(whole.start());
        let end = index.char_offset(whole.end());

        // Newlines are counted incrementally from the previous match.
        let line_number = if options.include_line_numbers {
            line += text[line_cursor..whole.start()].matches('\n').count();
            line_cursor = whole.start();
            Some(line)
        } else {
            None
        };

        let window_start = start.saturating_sub(options.context_chars);
        let window_end = end.saturating_add(options.context_chars).min(total_chars);

        matches.push(SearchMatch {
            match_text: whole.as_str().to_string(),
            index: start,
            line_number,
            context: index.slice(window_start, window_end).to_string(),
            groups: caps
                .iter()
                .skip(1)
                .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        });
    }

    tracing::debug!(pattern, matches = matches.len(), "search complete");
    Ok(matches)
}

/// Returns the char offset of every occurrence of `needle` in `text`.
///
/// Occurrences may overlap; the scan resumes one char after each hit. An
/// empty needle has no occurrences. Case-insensitive mode lowercases both
/// operands once and maps hits back to offsets in the original text.
///
/// # Examples
///
/// ```
/// use rlm_context::search::find_all;
///
/// assert_eq!(find_all("AbcABCabc", "abc", false), vec![0, 3, 6]);
/// assert_eq!(find_all("AbcABCabc", "abc", true), vec![6]);
/// assert_eq!(find_all("aaa", "aa", true), vec![0, 1]);
/// ```
#[must_use]
pub fn find_all(text: &str, needle: &str, case_sensitive: bool) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    if case_sensitive {
        return overlapping_hits(text, needle);
    }

    // Lowercasing can change char counts, so keep the source char of each
    // lowered char.
    let mut lowered = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len());
    for (i, ch) in text.chars().enumerate() {
        for lower in ch.to_lowercase() {
            lowered.push(lower);
            origin.push(i);
        }
    }

    overlapping_hits(&lowered, &needle.to_lowercase())
        .into_iter()
        .filter_map(|hit| origin.get(hit).copied())
        .collect()
}

/// Char offsets of possibly overlapping occurrences of a non-empty needle.
fn overlapping_hits(haystack: &str, needle: &str) -> Vec<usize> {
    let index = CharIndex::new(haystack);
    let mut hits = Vec::new();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let at = from + pos;
        hits.push(index.char_offset(at));
        let step = haystack[at..].chars().next().map_or(1, char::len_utf8);
        from = at + step;
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_basic_with_context() {
        let text = "the quick brown fox";
        let options = SearchOptions {
            context_chars: 4,
            ..SearchOptions::default()
        };
        let matches = search(text, "brown", &options).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_text, "brown");
        assert_eq!(matches[0].index, 10);
        assert_eq!(matches[0].context, "ick brown fox");
    }

    #[test]
    fn test_search_context_clamped() {
        let matches = search("abc", "b", &SearchOptions::default()).unwrap();
        assert_eq!(matches[0].context, "abc");
    }

    #[test]
    fn test_search_line_numbers() {
        let text = "one\ntwo\nthree\ntwo";
        let matches = search(text, "two", &SearchOptions::default()).unwrap();
        let lines: Vec<_> = matches.iter().map(|m| m.line_number).collect();
        assert_eq!(lines, vec![Some(2), Some(4)]);

        let options = SearchOptions {
            include_line_numbers: false,
            ..SearchOptions::default()
        };
        let matches = search(text, "two", &options).unwrap();
        assert!(matches.iter().all(|m| m.line_number.is_none()));
    }

    #[test]
    fn test_search_max_results() {
        let options = SearchOptions {
            max_results: 2,
            ..SearchOptions::default()
        };
        let matches = search("a a a a", "a", &options).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_search_zero_length_matches_terminate() {
        let matches = search("abc", "x*", &SearchOptions::default()).unwrap();
        let indices: Vec<_> = matches.iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_search_flags() {
        let options = SearchOptions {
            flags: "gi".to_string(),
            ..SearchOptions::default()
        };
        assert_eq!(search("Foo foo", "foo", &options).unwrap().len(), 2);

        let options = SearchOptions {
            flags: "m".to_string(),
            ..SearchOptions::default()
        };
        assert_eq!(search("a\nb", "^b$", &options).unwrap().len(), 1);
    }

    #[test]
    fn test_search_invalid_flag() {
        let options = SearchOptions {
            flags: "q".to_string(),
            ..SearchOptions::default()
        };
        let err = search("x", "x", &options).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Search(SearchError::InvalidFlag { flag: 'q' })
        ));
    }

    #[test]
    fn test_search_invalid_pattern_is_error() {
        let err = search("x", "(unclosed", &SearchOptions::default()).unwrap_err();
        assert_eq!(err.code(), "InvalidPattern");
    }

    #[test]
    fn test_search_unmatched_groups_are_empty() {
        let matches = search("b", "(a)|(b)", &SearchOptions::default()).unwrap();
        assert_eq!(matches[0].groups, vec![String::new(), "b".to_string()]);
    }

    #[test]
    fn test_search_unicode_offsets() {
        let text = "日本語 text here";
        let options = SearchOptions {
            context_chars: 2,
            ..SearchOptions::default()
        };
        let matches = search(text, "text", &options).unwrap();
        assert_eq!(matches[0].index, 4);
        assert_eq!(matches[0].context, "語 text h");
    }

    #[test]
    fn test_search_is_idempotent() {
        let text = "a1 b2 c3 a4";
        let first = search(text, r"[a-c]\d", &SearchOptions::default()).unwrap();
        let second = search(text, r"[a-c]\d", &SearchOptions::default()).unwrap();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].index < w[1].index));
    }

    #[test]
    fn test_search_match_serialization() {
        let matches = search("xyz", "y", &SearchOptions::default()).unwrap();
        let json = serde_json::to_value(&matches[0]).unwrap();
        assert_eq!(json["match"], "y");
        assert_eq!(json["lineNumber"], 1);
    }

    #[test]
    fn test_find_all_case_insensitive() {
        assert_eq!(find_all("AbcABCabc", "abc", false), vec![0, 3, 6]);
    }

    #[test]
    fn test_find_all_empty_needle() {
        assert!(find_all("abc", "", true).is_empty());
        assert!(find_all("abc", "", false).is_empty());
    }

    #[test]
    fn test_find_all_unicode() {
        assert_eq!(find_all("héllo héllo", "llo", true), vec![2, 8]);
        assert_eq!(find_all("ÄBC äbc", "äbc", false), vec![0, 4]);
    }

    #[test]
    fn test_find_all_no_hits() {
        assert!(find_all("abc", "zzz", true).is_empty());
    }
}
