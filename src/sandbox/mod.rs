//! Sandboxed script execution.
//!
//! Scripts are Rhai programs evaluated by an engine built fresh for each
//! execution. The engine has no module loader, no `eval`, and no file,
//! network or process access. The only state it can reach is a read-only
//! snapshot of the session's contexts and a working copy of its variables
//! and answer.
//!
//! A script may spin in a loop the engine never leaves on its own, so
//! evaluation runs on the blocking pool under a wall-clock timeout. At the
//! deadline the caller gets an error result immediately, and the engine's
//! progress hook stops the worker at its next operation.

mod helpers;
mod output;

pub use output::OutputBuffer;

use crate::config::SandboxConfig;
use crate::core::ExecutionRecord;
use crate::error::{Error, ExecutionError};
use crate::session::Session;
use helpers::{ScriptEnv, ScriptState, root_cause, tagged_error};
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Outcome of one script execution.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Captured output, possibly truncated.
    pub output: String,
    /// Failure, if the script did not complete.
    pub error: Option<Error>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Returns whether the script completed.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs scripts against a session under the configured limits.
///
/// # Examples
///
/// ```
/// use rlm_context::config::SandboxConfig;
/// use rlm_context::sandbox::ScriptSandbox;
/// use rlm_context::session::Session;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let sandbox = ScriptSandbox::new(SandboxConfig::default());
/// let mut session = Session::new("demo", 10);
/// session.load_context("doc", "one two three");
///
/// let result = sandbox
///     .execute(&mut session, r#"print(words(get_context("doc")).len());"#)
///     .await;
/// assert!(result.succeeded());
/// assert_eq!(result.output, "3\n");
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptSandbox {
    config: SandboxConfig,
}

/// Worker-side view of the limits.
struct Limits {
    deadline: Instant,
    abort: Arc<AtomicBool>,
    max_operations: u64,
}

impl ScriptSandbox {
    /// Creates a sandbox.
    #[must_use]
    pub const fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Returns the sandbox configuration.
    #[must_use]
    pub const fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Executes `code` against `session`.
    ///
    /// Never fails: errors and timeouts are reported in the result. Output
    /// captured before a failure is kept, variables and answer are written
    /// back as they stood when the script ended, and one record is appended
    /// to the session's history.
    pub async fn execute(&self, session: &mut Session, code: &str) -> ExecutionResult {
        let started = Instant::now();
        let timeout = self.config.timeout;

        let env = ScriptEnv {
            contexts: Arc::new(session.contexts().clone()),
            state: Arc::new(Mutex::new(ScriptState {
                variables: session.variables().clone(),
                answer: session.answer().clone(),
            })),
        };
        let output = Arc::new(Mutex::new(OutputBuffer::new(self.config.max_output_bytes)));
        let abort = Arc::new(AtomicBool::new(false));
        let limits = Limits {
            deadline: started + timeout,
            abort: Arc::clone(&abort),
            max_operations: self.config.max_operations,
        };

        let worker = {
            let env = env.clone();
            let output = Arc::clone(&output);
            let code = code.to_string();
            tokio::task::spawn_blocking(move || run_script(&code, &env, &output, &limits))
        };

        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let error = match tokio::time::timeout(timeout, worker).await {
            Ok(Ok(Ok(value))) => {
                if !value.is_unit() {
                    lock(&output).push_line(&format!("=> {value}"));
                }
                None
            }
            Ok(Ok(Err(err))) => Some(script_error(&err, timeout_ms)),
            Ok(Err(join_err)) => Some(ExecutionError::Panicked(join_err.to_string()).into()),
            Err(_) => {
                abort.store(true, Ordering::Relaxed);
                Some(ExecutionError::Timeout { timeout_ms }.into())
            }
        };

        let state = lock(&env.state).clone();
        session.replace_variables(state.variables);
        session.set_answer(state.answer);

        let output = lock(&output).as_str().to_string();
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &error {
            Some(Error::Execution(ExecutionError::Timeout { .. })) => {
                tracing::warn!(session = session.id(), timeout_ms, "script timed out");
            }
            Some(err) => {
                tracing::debug!(session = session.id(), error = %err, "script failed");
            }
            None => {
                tracing::debug!(session = session.id(), duration_ms, "script completed");
            }
        }

        session.record_execution(ExecutionRecord {
            code: code.to_string(),
            output: output.clone(),
            error: error.as_ref().map(ToString::to_string),
            duration_ms,
        });

        ExecutionResult {
            output,
            error,
            duration_ms,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds a locked-down engine wired to `env` and `output`.
fn build_engine(env: &ScriptEnv, output: &Arc<Mutex<OutputBuffer>>, limits: &Limits) -> Engine {
    let mut engine = Engine::new();
    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");
    if limits.max_operations > 0 {
        engine.set_max_operations(limits.max_operations);
    }

    let abort = Arc::clone(&limits.abort);
    let deadline = limits.deadline;
    engine.on_progress(move |_| {
        if abort.load(Ordering::Relaxed) || Instant::now() >= deadline {
            Some(Dynamic::UNIT)
        } else {
            None
        }
    });

    let out = Arc::clone(output);
    engine.on_print(move |text| lock(&out).push_line(text));
    let out = Arc::clone(output);
    engine.on_debug(move |text, _, _| lock(&out).push_line(text));

    helpers::register(&mut engine, env);
    engine
}

fn run_script(
    code: &str,
    env: &ScriptEnv,
    output: &Arc<Mutex<OutputBuffer>>,
    limits: &Limits,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let engine = build_engine(env, output, limits);
    let mut scope = Scope::new();
    engine.eval_with_scope::<Dynamic>(&mut scope, code)
}

/// Maps an engine failure to the execution error reported to the caller.
fn script_error(err: &EvalAltResult, timeout_ms: u64) -> Error {
    match root_cause(err) {
        // Only the progress hook terminates scripts.
        EvalAltResult::ErrorTerminated(..) => ExecutionError::Timeout { timeout_ms }.into(),
        EvalAltResult::ErrorRuntime(value, _) => tagged_error(value)
            .unwrap_or_else(|| ExecutionError::Runtime(err.to_string()).into()),
        _ => ExecutionError::Runtime(err.to_string()).into(),
    }
}
