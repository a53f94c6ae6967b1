//! Error types for context engine operations.
//!
//! This module provides the error hierarchy using `thiserror` for session
//! lookup, decomposition, search, script execution, I/O and the tool-call
//! boundary. Every error maps to a stable code via [`Error::code`] so the
//! boundary can report structured failures instead of aborting.

use thiserror::Error;

/// Result type alias for context engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for context engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Session, context or variable lookup errors.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Decomposition errors (text processing).
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// Search errors (pattern compilation).
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Script execution errors.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Tool-call and command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

impl Error {
    /// Returns the stable, machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Session(e) => e.code(),
            Self::Chunking(ChunkingError::Regex(_)) => "InvalidPattern",
            Self::Chunking(_) => "InvalidChunkConfig",
            Self::Search(_) => "InvalidPattern",
            Self::Execution(e) => e.code(),
            Self::Io(_) => "IoError",
            Self::Command(CommandError::UnknownTool(_)) => "UnknownTool",
            Self::Command(CommandError::Internal(_)) => "InternalError",
            Self::Command(_) => "InvalidArgument",
            Self::Config { .. } => "ConfigError",
        }
    }
}

/// Lookup errors against the session registry and a resolved session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Unknown or expired session id.
    #[error("session not found: {id}")]
    SessionNotFound {
        /// Session id that was not found.
        id: String,
    },

    /// Unknown context id within a resolved session.
    #[error("context not found: {id}")]
    ContextNotFound {
        /// Context id that was not found.
        id: String,
    },

    /// Unknown variable name within a resolved session.
    #[error("variable not found: {name}")]
    VariableNotFound {
        /// Variable name that was not found.
        name: String,
    },
}

impl SessionError {
    const fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound { .. } => "SessionNotFound",
            Self::ContextNotFound { .. } => "ContextNotFound",
            Self::VariableNotFound { .. } => "VariableNotFound",
        }
    }
}

/// Decomposition-specific errors.
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// Invalid chunk configuration.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },

    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(String),

    /// Unknown decomposition strategy.
    #[error("unknown chunking strategy: {name}")]
    UnknownStrategy {
        /// Name of the unknown strategy.
        name: String,
    },
}

/// Search-specific errors.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// An unsupported regex flag was supplied.
    #[error("invalid pattern flag: {flag:?}")]
    InvalidFlag {
        /// The rejected flag character.
        flag: char,
    },
}

/// Script execution errors.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The script ran past its wall-clock deadline.
    #[error("execution timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The script raised an error during parsing or evaluation.
    #[error("{0}")]
    Runtime(String),

    /// The worker running the script died unexpectedly.
    #[error("execution worker failed: {0}")]
    Panicked(String),
}

impl ExecutionError {
    const fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "ExecutionTimeout",
            Self::Runtime(_) | Self::Panicked(_) => "ExecutionRuntimeError",
        }
    }
}

/// Errors raised while ingesting files from disk.
#[derive(Error, Debug)]
pub enum IoError {
    /// Missing file or directory.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that does not exist.
        path: String,
    },

    /// The file exists but could not be loaded as text.
    #[error("cannot read {path}: {reason}")]
    ReadFailed {
        /// Offending path.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// The file could not be memory-mapped.
    #[error("cannot map {path}: {reason}")]
    MmapFailed {
        /// Offending path.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// Document fetch failed.
    #[error("fetch failed: {url}: {reason}")]
    FetchFailed {
        /// Repository URL that was requested.
        url: String,
        /// Diagnostic text reported by the fetcher.
        reason: String,
    },

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// Tool-call and CLI command errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Unknown tool name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A request could not be answered by its handler.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<regex::Error> for ChunkingError {
    fn from(err: regex::Error) -> Self {
        Self::Regex(err.to_string())
    }
}

impl From<regex::Error> for SearchError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidPattern(err.to_string())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Command(err.into())
    }
}
