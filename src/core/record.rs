//! Answer state and execution history records.

use serde::{Deserialize, Serialize};

/// The caller's answer for a session.
///
/// `ready` is caller-asserted: `false` marks a partial answer still being
/// built, `true` the declared final answer. Nothing promotes it implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text.
    pub content: String,
    /// Whether the caller declared the answer final.
    pub ready: bool,
}

impl Answer {
    /// Creates an answer.
    #[must_use]
    pub fn new(content: impl Into<String>, ready: bool) -> Self {
        Self {
            content: content.into(),
            ready,
        }
    }
}

/// One script execution, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Script source.
    pub code: String,
    /// Captured output (possibly truncated).
    pub output: String,
    /// Error message when the execution failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionRecord {
    /// Returns whether the execution succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
