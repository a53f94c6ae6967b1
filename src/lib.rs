//! # rlm-context
//!
//! Session-scoped context engine for texts far larger than a model's
//! context window.
//!
//! Callers load texts into isolated sessions, then inspect them in bounded
//! pieces instead of reading them whole: decompose into chunks, run regex
//! and substring searches, compute statistics, and run sandboxed scripts
//! over the loaded text with session-scoped variables and an answer slot.
//!
//! ## Features
//!
//! - **Decomposition**: fixed-size, line, paragraph, Markdown section,
//!   regex and sentence strategies with exact char offsets
//! - **Search**: regex search with context windows and line numbers,
//!   overlapping substring search
//! - **Script sandbox**: embedded Rhai engine with a fixed capability
//!   surface, a wall-clock timeout and a capped output buffer
//! - **Sessions**: per-session locking, inactivity eviction and capacity
//!   limits
//! - **Tool boundary**: every operation callable by name with JSON
//!   arguments, answering with JSON

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

use regex::Regex;
use std::sync::OnceLock;

/// Returns the regex in `cell`, compiling `pattern` on first use.
///
/// Only called through `static_regex!` with literal patterns.
#[allow(clippy::expect_used)]
pub(crate) fn compiled_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

/// Lazily compiled static regex.
macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        $crate::compiled_regex(&$name, $pattern)
    }};
}

pub mod analysis;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod io;
pub mod sandbox;
pub mod search;
pub mod session;
pub mod tools;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{Answer, Chunk, ChunkMetadata, Context, ContextMetadata, ExecutionRecord, Structure, Value};

// Re-export chunking types
pub use chunking::{
    Chunker, DecomposeOptions, Strategy, StrategyInfo, available_strategies, create_chunker, decompose,
    strategy_catalog,
};

// Re-export analysis and search
pub use analysis::{compute_statistics, detect_structure, suggest_strategy};
pub use search::{SearchMatch, SearchOptions, find_all, search};

// Re-export sessions, sandbox and the tool boundary
pub use config::Config;
pub use sandbox::{ExecutionResult, ScriptSandbox};
pub use session::{Session, SessionHandle, SessionRegistry};
pub use tools::{TOOL_NAMES, ToolService};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
