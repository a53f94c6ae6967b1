//! Per-session state: contexts, variables, answer and execution history.

use crate::core::{Answer, Context, ContextMetadata, ExecutionRecord, Value, current_timestamp_ms};
use crate::error::{Result, SessionError};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// An isolated unit of state.
///
/// A session is only ever mutated through the lock held by its
/// [`SessionHandle`](super::SessionHandle), so every method here assumes
/// exclusive access.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: i64,
    contexts: HashMap<String, Arc<Context>>,
    variables: BTreeMap<String, Value>,
    answer: Answer,
    history: VecDeque<ExecutionRecord>,
    history_limit: usize,
}

impl Session {
    /// Creates an empty session keeping at most `history_limit` records.
    #[must_use]
    pub fn new(id: impl Into<String>, history_limit: usize) -> Self {
        Self {
            id: id.into(),
            created_at: current_timestamp_ms(),
            contexts: HashMap::new(),
            variables: BTreeMap::new(),
            answer: Answer::default(),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the creation timestamp in Unix milliseconds.
    #[must_use]
    pub const fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Loads `content` under `context_id`, replacing any previous context
    /// with that id as a whole.
    pub fn load_context(&mut self, context_id: &str, content: impl Into<Arc<str>>) -> Arc<Context> {
        let context = Arc::new(Context::new(context_id, content));
        self.contexts
            .insert(context_id.to_string(), Arc::clone(&context));
        context
    }

    /// Returns a shared handle to a context.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ContextNotFound`] for an unknown id.
    pub fn context(&self, context_id: &str) -> Result<Arc<Context>> {
        self.contexts.get(context_id).cloned().ok_or_else(|| {
            SessionError::ContextNotFound {
                id: context_id.to_string(),
            }
            .into()
        })
    }

    /// Returns all contexts keyed by id.
    #[must_use]
    pub const fn contexts(&self) -> &HashMap<String, Arc<Context>> {
        &self.contexts
    }

    /// Returns context ids in sorted order.
    #[must_use]
    pub fn context_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.contexts.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Sets a variable, replacing any previous value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Returns a variable.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::VariableNotFound`] for an unknown name.
    pub fn variable(&self, name: &str) -> Result<&Value> {
        self.variables.get(name).ok_or_else(|| {
            SessionError::VariableNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Returns all variables in name order.
    #[must_use]
    pub const fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    /// Replaces the whole variable map.
    pub fn replace_variables(&mut self, variables: BTreeMap<String, Value>) {
        self.variables = variables;
    }

    /// Returns the current answer.
    #[must_use]
    pub const fn answer(&self) -> &Answer {
        &self.answer
    }

    /// Replaces the answer.
    pub fn set_answer(&mut self, answer: Answer) {
        self.answer = answer;
    }

    /// Appends an execution record, dropping the oldest past the limit.
    pub fn record_execution(&mut self, record: ExecutionRecord) {
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    /// Returns the execution history, oldest first.
    #[must_use]
    pub const fn history(&self) -> &VecDeque<ExecutionRecord> {
        &self.history
    }

    /// Resets contexts, variables, answer and history; the identity stays.
    pub fn clear(&mut self) {
        self.contexts.clear();
        self.variables.clear();
        self.answer = Answer::default();
        self.history.clear();
    }

    /// Summarizes the session for reporting.
    #[must_use]
    pub fn info(&self, last_activity_at: i64) -> SessionInfo {
        let mut contexts: Vec<_> = self
            .contexts
            .values()
            .map(|ctx| ContextSummary {
                id: ctx.id.clone(),
                created_at: ctx.created_at,
                metadata: ctx.metadata.clone(),
            })
            .collect();
        contexts.sort_by(|a, b| a.id.cmp(&b.id));

        SessionInfo {
            id: self.id.clone(),
            created_at: self.created_at,
            last_activity_at,
            contexts,
            variables: self.variables.keys().cloned().collect(),
            answer_ready: self.answer.ready,
            history_length: self.history.len(),
        }
    }
}

/// Context entry in a [`SessionInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    /// Context id.
    pub id: String,
    /// Load timestamp in Unix milliseconds.
    pub created_at: i64,
    /// Computed metadata.
    pub metadata: ContextMetadata,
}

/// Reportable snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Session id.
    pub id: String,
    /// Creation timestamp in Unix milliseconds.
    pub created_at: i64,
    /// Last activity timestamp in Unix milliseconds.
    pub last_activity_at: i64,
    /// Loaded contexts, sorted by id.
    pub contexts: Vec<ContextSummary>,
    /// Variable names, sorted.
    pub variables: Vec<String>,
    /// Whether the answer was declared final.
    pub answer_ready: bool,
    /// Number of retained execution records.
    pub history_length: usize,
}
