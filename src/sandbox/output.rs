//! Size-capped capture buffer for script output.

use crate::io::find_char_boundary;

/// Collects printed lines up to a byte limit.
///
/// Once the limit is reached the buffer keeps what fits, appends a single
/// truncation marker and ignores further writes.
///
/// # Examples
///
/// ```
/// use rlm_context::sandbox::OutputBuffer;
///
/// let mut out = OutputBuffer::new(8);
/// out.push_line("hello");
/// out.push_line("world");
/// assert!(out.is_truncated());
/// assert!(out.as_str().starts_with("hello\nwo"));
/// assert!(out.as_str().ends_with("[output truncated after 8 bytes]\n"));
/// ```
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    text: String,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    /// Creates an empty buffer holding at most `limit` bytes of output.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            truncated: false,
        }
    }

    /// Appends `line` and a newline.
    pub fn push_line(&mut self, line: &str) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.text.len());
        if line.len() < room {
            self.text.push_str(line);
            self.text.push('\n');
            return;
        }

        let fits = find_char_boundary(line, room);
        self.text.push_str(&line[..fits]);
        if !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text
            .push_str(&format!("[output truncated after {} bytes]\n", self.limit));
        self.truncated = true;
        tracing::warn!(limit = self.limit, "script output truncated");
    }

    /// Returns whether the limit was hit.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the captured text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the buffer, returning the captured text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}
