//! Output formatting for CLI commands.
//!
//! Supports compact JSON (one response per line) and a readable text form.

use crate::error::Error;
use crate::tools::failure_response;
use crate::tools::types::ToolListResponse;
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Single-line JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "text" => Self::Text,
            _ => Self::Json,
        }
    }
}

/// Formats a tool response.
#[must_use]
pub fn format_response(response: &serde_json::Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json_line(response),
        OutputFormat::Text => {
            let mut output = serde_json::to_string_pretty(response)
                .unwrap_or_else(|_| "{}".to_string());
            output.push('\n');
            output
        }
    }
}

/// Formats the tool list.
#[must_use]
pub fn format_tool_list(list: &ToolListResponse, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json_line(list),
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "Tools ({}):", list.tools.len());
            for tool in &list.tools {
                let _ = writeln!(output, "  {tool}");
            }
            let _ = writeln!(output, "\nStrategies ({}):", list.strategies.len());
            for info in &list.strategies {
                let _ = writeln!(output, "  {:<14} {}", info.name, info.description);
            }
            output
        }
    }
}

/// Formats an error that escaped the tool boundary.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json_line(&failure_response(error)),
        OutputFormat::Text => format!("{} ({})\n", error, error.code()),
    }
}

/// Serializes a value as one JSON line.
pub(crate) fn format_json_line<T: Serialize>(value: &T) -> String {
    let mut line = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    line
}
