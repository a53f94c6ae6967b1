//! Unicode utilities for text processing.
//!
//! All offsets exposed by the engine are counted in Unicode scalar values
//! (chars), while the regex engine and `str` slicing work in bytes.
//! [`CharIndex`] converts between the two without rescanning the text.

/// Finds a valid UTF-8 character boundary at or before the given position.
///
/// # Examples
///
/// ```
/// use rlm_context::io::find_char_boundary;
///
/// let s = "Hello 世界";
/// assert_eq!(find_char_boundary(s, 6), 6); // Before '世'
/// assert_eq!(find_char_boundary(s, 7), 6); // Middle of '世', backs up
/// ```
#[must_use]
pub const fn find_char_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    let bytes = s.as_bytes();
    let mut boundary = pos;
    // UTF-8 continuation bytes start with 10xxxxxx (0x80-0xBF)
    while boundary > 0 && (bytes[boundary] & 0xC0) == 0x80 {
        boundary -= 1;
    }
    boundary
}

/// Bidirectional char/byte offset map over a borrowed text.
///
/// ASCII text needs no table since byte and char offsets coincide; other
/// text keeps one byte offset per char.
///
/// # Examples
///
/// ```
/// use rlm_context::io::CharIndex;
///
/// let index = CharIndex::new("héllo");
/// assert_eq!(index.char_len(), 5);
/// assert_eq!(index.byte_offset(2), 3);
/// assert_eq!(index.char_offset(3), 2);
/// assert_eq!(index.slice(1, 3), "él");
/// ```
#[derive(Debug, Clone)]
pub struct CharIndex<'a> {
    text: &'a str,
    /// Byte offset of every char; `None` for ASCII text.
    offsets: Option<Vec<usize>>,
}

impl<'a> CharIndex<'a> {
    /// Builds the index for `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let offsets = if text.is_ascii() {
            None
        } else {
            Some(text.char_indices().map(|(b, _)| b).collect())
        };
        Self { text, offsets }
    }

    /// Returns the indexed text.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// Returns the text length in chars.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.offsets.as_ref().map_or(self.text.len(), Vec::len)
    }

    /// Converts a char offset to a byte offset, clamping to the text end.
    #[must_use]
    pub fn byte_offset(&self, char_pos: usize) -> usize {
        match &self.offsets {
            None => char_pos.min(self.text.len()),
            Some(offsets) => offsets.get(char_pos).copied().unwrap_or(self.text.len()),
        }
    }

    /// Converts a byte offset to a char offset.
    ///
    /// A byte offset inside a multi-byte char maps to that char.
    #[must_use]
    pub fn char_offset(&self, byte_pos: usize) -> usize {
        match &self.offsets {
            None => byte_pos.min(self.text.len()),
            Some(offsets) => {
                if byte_pos >= self.text.len() {
                    return offsets.len();
                }
                offsets.partition_point(|&b| b <= byte_pos).saturating_sub(1)
            }
        }
    }

    /// Returns the substring between two char offsets (clamped, never panics).
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let start_byte = self.byte_offset(start);
        let end_byte = self.byte_offset(end).max(start_byte);
        &self.text[start_byte..end_byte]
    }
}

/// Returns the number of chars in `s`.
#[must_use]
pub fn char_len(s: &str) -> usize {
    if s.is_ascii() { s.len() } else { s.chars().count() }
}

/// Returns the first `max_chars` chars of `s`.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

/// Splits text on `'\n'`, dropping the empty tail produced by a trailing newline.
///
/// Text with and without a trailing newline yields the same lines; empty
/// text yields no lines.
#[must_use]
pub fn split_lines(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    let body = s.strip_suffix('\n').unwrap_or(s);
    body.split('\n').collect()
}
