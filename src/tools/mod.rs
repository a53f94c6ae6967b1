//! Tool-call boundary.
//!
//! [`ToolService`] owns the session registry and the script sandbox and
//! exposes every operation twice: as a typed async method, and through
//! [`ToolService::dispatch`], which takes a tool name plus JSON arguments
//! and always answers with a JSON object. Failures never escape as errors
//! there; they become `{"success": false, "error": {"code", "message"}}`.

mod service;
pub mod types;

pub use service::ToolService;

use crate::error::Error;
use serde_json::{Value, json};

/// Names of every tool accepted by [`ToolService::dispatch`].
pub const TOOL_NAMES: &[&str] = &[
    "load_context",
    "get_context_info",
    "read_context",
    "decompose_context",
    "get_chunks",
    "search_context",
    "find_all",
    "execute_code",
    "set_variable",
    "get_variable",
    "list_variables",
    "set_answer",
    "get_answer",
    "create_session",
    "get_session_info",
    "clear_session",
    "suggest_strategy",
    "get_statistics",
    "get_execution_history",
    "ingest_documents",
    "list_tools",
];

/// Most chunk indices accepted by one `get_chunks` call.
pub const MAX_CHUNK_INDICES: usize = 50;

/// Chunks summarized when a `decompose_context` response is over budget.
pub const TRUNCATED_CHUNK_COUNT: usize = 10;

/// Builds the structured failure object for `err`.
#[must_use]
pub fn failure_response(err: &Error) -> Value {
    json!({
        "success": false,
        "error": {
            "code": err.code(),
            "message": err.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    #[test]
    fn test_failure_response_shape() {
        let err: Error = SessionError::ContextNotFound {
            id: "doc".to_string(),
        }
        .into();
        let value = failure_response(&err);
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "ContextNotFound");
        assert_eq!(value["error"]["message"], "context not found: doc");
    }

    #[test]
    fn test_tool_names_unique() {
        let mut names = TOOL_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TOOL_NAMES.len());
    }
}
