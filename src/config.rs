//! Engine configuration.
//!
//! Every limit the engine enforces lives here with its default. The binary
//! fills these from command-line flags and `RLM_CONTEXT_*` variables.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default maximum number of live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 100;

/// Default inactivity window before a session is evicted.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default period of the eviction sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Well-known id of the implicit session.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Default script wall-clock limit.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on captured script output, in bytes.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 102_400;

/// Default number of execution records kept per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default byte budget for a `decompose_context` response.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 100_000;

/// Default preview length, in chars.
pub const DEFAULT_PREVIEW_LENGTH: usize = 500;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Session registry limits.
    pub registry: RegistryConfig,
    /// Script sandbox limits.
    pub sandbox: SandboxConfig,
    /// Tool boundary limits.
    pub service: ServiceConfig,
}

impl Config {
    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        self.sandbox.validate()?;
        self.service.validate()
    }
}

/// Session registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Sessions admitted before the least recently active one is evicted.
    pub max_sessions: usize,
    /// Inactivity window after which a session is evicted.
    pub session_timeout: Duration,
    /// Period of the background sweep; never longer than the timeout.
    pub sweep_interval: Duration,
    /// Id of the lazily created default session.
    pub default_session_id: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            default_session_id: DEFAULT_SESSION_ID.to_string(),
        }
    }
}

impl RegistryConfig {
    /// Returns the sweep interval clamped to the session timeout.
    #[must_use]
    pub fn effective_sweep_interval(&self) -> Duration {
        self.sweep_interval.min(self.session_timeout)
    }

    fn validate(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Err(invalid("max_sessions must be > 0"));
        }
        if self.session_timeout.is_zero() {
            return Err(invalid("session_timeout must be > 0"));
        }
        if self.sweep_interval.is_zero() {
            return Err(invalid("sweep_interval must be > 0"));
        }
        if self.default_session_id.trim().is_empty() {
            return Err(invalid("default_session_id must not be empty"));
        }
        Ok(())
    }
}

/// Script sandbox configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Wall-clock limit per execution.
    pub timeout: Duration,
    /// Captured output cap in bytes.
    pub max_output_bytes: usize,
    /// Execution records kept per session; oldest are dropped.
    pub history_limit: usize,
    /// Engine operation limit per execution; 0 means unlimited.
    pub max_operations: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_EXECUTION_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_operations: 0,
        }
    }
}

impl SandboxConfig {
    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(invalid("execution timeout must be > 0"));
        }
        if self.history_limit == 0 {
            return Err(invalid("history_limit must be > 0"));
        }
        Ok(())
    }
}

/// Tool boundary configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Serialized size above which `decompose_context` returns a summary.
    pub max_response_bytes: usize,
    /// Preview length used when a request does not give one.
    pub default_preview_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            default_preview_length: DEFAULT_PREVIEW_LENGTH,
        }
    }
}

impl ServiceConfig {
    fn validate(&self) -> Result<()> {
        if self.max_response_bytes == 0 {
            return Err(invalid("max_response_bytes must be > 0"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::Config {
        message: message.to_string(),
    }
}
