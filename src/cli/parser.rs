//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros. Every engine limit
//! has a flag with an `RLM_CONTEXT_*` environment fallback.

use crate::config::{
    Config, DEFAULT_EXECUTION_TIMEOUT, DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_OUTPUT_BYTES,
    DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_MAX_SESSIONS, DEFAULT_PREVIEW_LENGTH, DEFAULT_SESSION_ID,
    DEFAULT_SESSION_TIMEOUT, DEFAULT_SWEEP_INTERVAL, RegistryConfig, SandboxConfig, ServiceConfig,
};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

/// rlm-context: session-scoped context engine for long texts.
///
/// Loads texts into sessions, decomposes and searches them, and runs
/// sandboxed scripts over them, all behind a JSON tool-call interface.
#[derive(Parser, Debug)]
#[command(name = "rlm-context")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for `call` and `tools` (json, text).
    #[arg(long, default_value = "json", global = true)]
    pub format: String,

    /// Engine limits.
    #[command(flatten)]
    pub limits: LimitArgs,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Engine limits, mapped onto [`Config`].
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LimitArgs {
    /// Sessions kept before the least recently active one is evicted.
    #[arg(long, env = "RLM_CONTEXT_MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Inactivity window in seconds after which a session is evicted.
    #[arg(long, env = "RLM_CONTEXT_SESSION_TIMEOUT_SECS", default_value_t = DEFAULT_SESSION_TIMEOUT.as_secs())]
    pub session_timeout_secs: u64,

    /// Period of the eviction sweep in seconds.
    #[arg(long, env = "RLM_CONTEXT_SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs())]
    pub sweep_interval_secs: u64,

    /// Id of the session used when a request names none.
    #[arg(long, env = "RLM_CONTEXT_DEFAULT_SESSION", default_value = DEFAULT_SESSION_ID)]
    pub default_session: String,

    /// Wall-clock limit per script execution, in milliseconds.
    #[arg(long, env = "RLM_CONTEXT_EXECUTION_TIMEOUT_MS", default_value_t = duration_ms(DEFAULT_EXECUTION_TIMEOUT))]
    pub execution_timeout_ms: u64,

    /// Captured script output cap in bytes.
    #[arg(long, env = "RLM_CONTEXT_MAX_OUTPUT_BYTES", default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    pub max_output_bytes: usize,

    /// Execution records kept per session.
    #[arg(long, env = "RLM_CONTEXT_HISTORY_LIMIT", default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub history_limit: usize,

    /// Script engine operation limit (0 = unlimited).
    #[arg(long, env = "RLM_CONTEXT_MAX_OPERATIONS", default_value_t = 0)]
    pub max_operations: u64,

    /// Byte budget of a `decompose_context` response.
    #[arg(long, env = "RLM_CONTEXT_MAX_RESPONSE_BYTES", default_value_t = DEFAULT_MAX_RESPONSE_BYTES)]
    pub max_response_bytes: usize,

    /// Default preview length in chars.
    #[arg(long, env = "RLM_CONTEXT_PREVIEW_LENGTH", default_value_t = DEFAULT_PREVIEW_LENGTH)]
    pub preview_length: usize,
}

impl LimitArgs {
    /// Builds the engine configuration.
    #[must_use]
    pub fn to_config(&self) -> Config {
        Config {
            registry: RegistryConfig {
                max_sessions: self.max_sessions,
                session_timeout: Duration::from_secs(self.session_timeout_secs),
                sweep_interval: Duration::from_secs(self.sweep_interval_secs),
                default_session_id: self.default_session.clone(),
            },
            sandbox: SandboxConfig {
                timeout: Duration::from_millis(self.execution_timeout_ms),
                max_output_bytes: self.max_output_bytes,
                history_limit: self.history_limit,
                max_operations: self.max_operations,
            },
            service: ServiceConfig {
                max_response_bytes: self.max_response_bytes,
                default_preview_length: self.preview_length,
            },
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve tool calls as newline-delimited JSON on stdin/stdout.
    ///
    /// Each input line is `{"id"?, "tool", "arguments"}`; each output line
    /// is the tool's JSON response, echoing `id` when given.
    Serve,

    /// Run a single tool call and print its response.
    Call {
        /// Tool name.
        tool: String,

        /// JSON arguments (`-` reads them from stdin).
        arguments: Option<String>,
    },

    /// List the available tools.
    Tools,
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
