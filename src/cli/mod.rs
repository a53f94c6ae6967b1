//! CLI layer for rlm-context.
//!
//! Provides the command-line interface using clap: a stdio server for
//! newline-delimited JSON tool calls, a one-shot `call`, and `tools`.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{ToolRequest, execute, serve};
pub use output::OutputFormat;
pub use parser::{Cli, Commands, LimitArgs};
