//! Tool handlers and JSON dispatch.

use super::types::{
    AnswerResponse, ChunkView, ContextInfoRequest, ContextInfoResponse, ContextRequest,
    DecomposeRequest, DecomposeResponse, ExecuteRequest, ExecuteResponse, FindAllRequest,
    FindAllResponse, GetChunksRequest, GetChunksResponse, HistoryRequest, HistoryResponse,
    IngestRequest, IngestResponse, ListVariablesResponse, LoadContextRequest, LoadContextResponse,
    ReadContextRequest, ReadContextResponse, ReadMode, SearchRequest, SearchResponse,
    SessionInfoResponse, SessionRequest, SessionResponse, SetAnswerRequest, SetVariableRequest,
    StatisticsResponse, SuggestionResponse, ToolListResponse, VariableRequest, VariableResponse,
    VariableSummary,
};
use super::{MAX_CHUNK_INDICES, TOOL_NAMES, TRUNCATED_CHUNK_COUNT, failure_response};
use crate::analysis::{compute_statistics, suggest_strategy};
use crate::chunking::{DecomposeOptions, Strategy, decompose, strategy_catalog};
use crate::config::Config;
use crate::core::{Answer, Chunk, Context, Value};
use crate::error::{CommandError, Error, Result};
use crate::ingest::{DirectoryAggregator, ingest_documents};
use crate::io::{CharIndex, char_len, split_lines, truncate_chars};
use crate::sandbox::ScriptSandbox;
use crate::search::{SearchOptions, find_all, search};
use crate::session::{SessionHandle, SessionRegistry};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Entry point for every tool call.
///
/// The session registry is built on first use, on the caller's tokio
/// runtime, and its sweeper starts with it.
///
/// # Examples
///
/// ```
/// use rlm_context::config::Config;
/// use rlm_context::tools::ToolService;
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let service = ToolService::new(Config::default()).unwrap();
/// let loaded = service
///     .dispatch("load_context", json!({ "context": "alpha\nbeta\n", "context_id": "doc" }))
///     .await;
/// assert_eq!(loaded["success"], true);
/// assert_eq!(loaded["metadata"]["lineCount"], 2);
///
/// let missing = service
///     .dispatch("get_context_info", json!({ "context_id": "nope" }))
///     .await;
/// assert_eq!(missing["error"]["code"], "ContextNotFound");
/// # service.shutdown();
/// # });
/// ```
#[derive(Debug)]
pub struct ToolService {
    config: Config,
    sandbox: ScriptSandbox,
    registry: OnceLock<Arc<SessionRegistry>>,
}

impl ToolService {
    /// Creates a service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sandbox: ScriptSandbox::new(config.sandbox.clone()),
            config,
            registry: OnceLock::new(),
        })
    }

    /// Returns the service configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the session registry, building it on first call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.registry.get_or_init(|| {
            let registry = Arc::new(SessionRegistry::new(
                self.config.registry.clone(),
                self.config.sandbox.history_limit,
            ));
            registry.start_sweeper();
            tracing::info!(
                max_sessions = self.config.registry.max_sessions,
                "session registry started"
            );
            registry
        })
    }

    /// Evicts every session and stops the sweeper. Does nothing if no
    /// request was ever served.
    pub fn shutdown(&self) {
        if let Some(registry) = self.registry.get() {
            registry.shutdown();
        }
    }

    /// Runs `tool` with JSON `arguments` and returns the JSON response.
    ///
    /// Successful responses carry `"success": true`; every failure is
    /// reported through [`failure_response`].
    pub async fn dispatch(&self, tool: &str, arguments: serde_json::Value) -> serde_json::Value {
        tracing::debug!(tool, "tool call");
        match self.call(tool, arguments).await {
            Ok(mut response) => {
                if let Some(object) = response.as_object_mut() {
                    object
                        .entry("success")
                        .or_insert(serde_json::Value::Bool(true));
                }
                response
            }
            Err(err) => {
                tracing::debug!(tool, code = err.code(), error = %err, "tool call failed");
                failure_response(&err)
            }
        }
    }

    /// Runs `tool` with JSON `arguments`, returning the response object
    /// without the `success` flag.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownTool`] for unknown names,
    /// [`CommandError::InvalidArgument`] for malformed arguments, and the
    /// handler's error otherwise.
    pub async fn call(&self, tool: &str, arguments: serde_json::Value) -> Result<serde_json::Value> {
        match tool {
            "load_context" => respond(self.load_context(parse(arguments)?).await?),
            "get_context_info" => respond(self.get_context_info(parse(arguments)?).await?),
            "read_context" => respond(self.read_context(parse(arguments)?).await?),
            "decompose_context" => respond(self.decompose_context(parse(arguments)?).await?),
            "get_chunks" => respond(self.get_chunks(parse(arguments)?).await?),
            "search_context" => respond(self.search_context(parse(arguments)?).await?),
            "find_all" => respond(self.find_all(parse(arguments)?).await?),
            "execute_code" => respond(self.execute_code(parse(arguments)?).await?),
            "set_variable" => respond(self.set_variable(parse(arguments)?).await?),
            "get_variable" => respond(self.get_variable(parse(arguments)?).await?),
            "list_variables" => respond(self.list_variables(parse(arguments)?).await?),
            "set_answer" => respond(self.set_answer(parse(arguments)?).await?),
            "get_answer" => respond(self.get_answer(parse(arguments)?).await?),
            "create_session" => respond(self.create_session(parse(arguments)?).await),
            "get_session_info" => respond(self.get_session_info(parse(arguments)?).await?),
            "clear_session" => respond(self.clear_session(parse(arguments)?).await?),
            "suggest_strategy" => respond(self.suggest_strategy(parse(arguments)?).await?),
            "get_statistics" => respond(self.get_statistics(parse(arguments)?).await?),
            "get_execution_history" => {
                respond(self.get_execution_history(parse(arguments)?).await?)
            }
            "ingest_documents" => respond(self.ingest_documents(parse(arguments)?).await?),
            "list_tools" => respond(Self::list_tools()),
            other => Err(CommandError::UnknownTool(other.to_string()).into()),
        }
    }

    /// Lists the tool names and the decomposition strategies.
    #[must_use]
    pub fn list_tools() -> ToolListResponse {
        ToolListResponse {
            tools: TOOL_NAMES.to_vec(),
            strategies: strategy_catalog(),
        }
    }

    /// Loads text as a context, replacing any context with the same id.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown session id.
    pub async fn load_context(&self, request: LoadContextRequest) -> Result<LoadContextResponse> {
        let handle = self.session(request.session_id.as_deref())?;
        let mut session = handle.lock().await;
        let context = session.load_context(&request.context_id, request.context);
        tracing::debug!(
            session = handle.id(),
            context = %request.context_id,
            length = context.metadata.length,
            structure = %context.metadata.structure,
            "context loaded"
        );
        Ok(LoadContextResponse {
            session_id: handle.id().to_string(),
            context_id: request.context_id,
            metadata: context.metadata.clone(),
        })
    }

    /// Reports a context's metadata and, optionally, a leading preview.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` or `ContextNotFound`.
    pub async fn get_context_info(
        &self,
        request: ContextInfoRequest,
    ) -> Result<ContextInfoResponse> {
        let context = self
            .context(request.session_id.as_deref(), &request.context_id)
            .await?;

        let (preview, preview_truncated) = if request.include_preview {
            let length = request
                .preview_length
                .unwrap_or(self.config.service.default_preview_length);
            let preview = truncate_chars(context.text(), length);
            let truncated = char_len(preview) < context.metadata.length;
            (Some(preview.to_string()), Some(truncated))
        } else {
            (None, None)
        };

        Ok(ContextInfoResponse {
            context_id: request.context_id,
            created_at: context.created_at,
            metadata: context.metadata.clone(),
            preview,
            preview_truncated,
        })
    }

    /// Reads a char range or a line range. Out-of-range bounds are clamped.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` or `ContextNotFound`.
    pub async fn read_context(&self, request: ReadContextRequest) -> Result<ReadContextResponse> {
        let context = self
            .context(request.session_id.as_deref(), &request.context_id)
            .await?;

        let content = match request.mode {
            ReadMode::Chars => {
                let index = CharIndex::new(context.text());
                let end = request.end.unwrap_or(usize::MAX).min(index.char_len());
                index.slice(request.start.min(end), end).to_string()
            }
            ReadMode::Lines => {
                let lines = split_lines(context.text());
                let end = request.end.unwrap_or(usize::MAX).min(lines.len());
                lines[request.start.min(end)..end].join("\n")
            }
        };

        Ok(ReadContextResponse {
            length: char_len(&content),
            content,
        })
    }

    /// Decomposes a context.
    ///
    /// When the serialized response would exceed the configured byte
    /// budget, only the offsets and lengths of the first chunks are
    /// returned, with `truncated` set.
    ///
    /// # Errors
    ///
    /// Returns lookup errors, `InvalidChunkConfig` for bad parameters or an
    /// unknown strategy, and `InvalidPattern` for a bad by-regex pattern.
    pub async fn decompose_context(&self, request: DecomposeRequest) -> Result<DecomposeResponse> {
        let context = self
            .context(request.session_id.as_deref(), &request.context_id)
            .await?;
        let strategy = parse_strategy(request.strategy.as_deref())?;
        let options = DecomposeOptions {
            chunk_size: request.chunk_size,
            overlap: request.overlap,
            lines_per_chunk: request.lines_per_chunk,
            pattern: request.pattern,
        };
        let chunks = decompose(context.text(), strategy, &options)?;

        let mut response = DecomposeResponse {
            context_id: request.context_id,
            strategy: strategy.as_str().to_string(),
            total_chunks: chunks.len(),
            chunks: chunks
                .iter()
                .map(|chunk| ChunkView::of(chunk, request.return_content))
                .collect(),
            truncated: false,
            hint: None,
        };

        let budget = self.config.service.max_response_bytes;
        let size = serde_json::to_vec(&response)?.len();
        if size > budget {
            tracing::debug!(size, budget, chunks = chunks.len(), "decomposition response truncated");
            response.chunks = chunks
                .iter()
                .take(TRUNCATED_CHUNK_COUNT)
                .map(ChunkView::summary)
                .collect();
            response.truncated = true;
            response.hint = Some(format!(
                "response exceeded {budget} bytes; showing offsets of the first {} of {} chunks, \
                 fetch chunk content with get_chunks",
                response.chunks.len(),
                response.total_chunks
            ));
        }
        Ok(response)
    }

    /// Re-derives a decomposition and returns the chunks at the requested
    /// indices. Indices past the end are skipped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless 1 to 50 indices are given, plus the
    /// errors of [`Self::decompose_context`].
    pub async fn get_chunks(&self, request: GetChunksRequest) -> Result<GetChunksResponse> {
        let requested = request.chunk_indices.len();
        if !(1..=MAX_CHUNK_INDICES).contains(&requested) {
            return Err(CommandError::InvalidArgument(format!(
                "chunk_indices must hold 1 to {MAX_CHUNK_INDICES} indices, got {requested}"
            ))
            .into());
        }

        let context = self
            .context(request.session_id.as_deref(), &request.context_id)
            .await?;
        let strategy = parse_strategy(request.strategy.as_deref())?;
        let options = DecomposeOptions {
            chunk_size: request.chunk_size,
            overlap: request.overlap,
            lines_per_chunk: request.lines_per_chunk,
            pattern: request.pattern,
        };
        let all = decompose(context.text(), strategy, &options)?;
        let chunks: Vec<Chunk> = request
            .chunk_indices
            .iter()
            .filter_map(|&index| all.get(index).cloned())
            .collect();

        Ok(GetChunksResponse {
            requested,
            returned: chunks.len(),
            chunks,
        })
    }

    /// Runs a regex search over a context.
    ///
    /// # Errors
    ///
    /// Returns lookup errors and `InvalidPattern`.
    pub async fn search_context(&self, request: SearchRequest) -> Result<SearchResponse> {
        let context = self
            .context(request.session_id.as_deref(), &request.context_id)
            .await?;
        let options = SearchOptions {
            flags: request.flags,
            context_chars: request.context_chars,
            max_results: request.max_results,
            include_line_numbers: request.include_line_numbers,
        };
        let matches = search(context.text(), &request.pattern, &options)?;
        Ok(SearchResponse {
            total_matches: matches.len(),
            matches,
        })
    }

    /// Finds every occurrence of a literal substring.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` or `ContextNotFound`.
    pub async fn find_all(&self, request: FindAllRequest) -> Result<FindAllResponse> {
        let context = self
            .context(request.session_id.as_deref(), &request.context_id)
            .await?;
        let offsets = find_all(context.text(), &request.substring, request.case_sensitive);
        Ok(FindAllResponse {
            count: offsets.len(),
            offsets,
        })
    }

    /// Executes a script against a session. The session stays locked for
    /// the whole run.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` only; script failures are part of the
    /// response.
    pub async fn execute_code(&self, request: ExecuteRequest) -> Result<ExecuteResponse> {
        let handle = self.session(request.session_id.as_deref())?;
        let mut session = handle.lock().await;
        let result = self.sandbox.execute(&mut session, &request.code).await;
        let success = result.succeeded();
        let error_code = result.error.as_ref().map(Error::code);
        Ok(ExecuteResponse {
            success,
            output: result.output,
            error: result.error.map(|e| e.to_string()),
            error_code,
            duration_ms: result.duration_ms,
        })
    }

    /// Stores a JSON value as a session variable.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn set_variable(&self, request: SetVariableRequest) -> Result<VariableResponse> {
        let value: Value = serde_json::from_value(request.value)?;
        let handle = self.session(request.session_id.as_deref())?;
        handle
            .lock()
            .await
            .set_variable(request.name.clone(), value.clone());
        Ok(VariableResponse {
            name: request.name,
            value,
        })
    }

    /// Reads a session variable.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` or `VariableNotFound`.
    pub async fn get_variable(&self, request: VariableRequest) -> Result<VariableResponse> {
        let handle = self.session(request.session_id.as_deref())?;
        let value = handle.lock().await.variable(&request.name)?.clone();
        Ok(VariableResponse {
            name: request.name,
            value,
        })
    }

    /// Lists variable names and types.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn list_variables(&self, request: SessionRequest) -> Result<ListVariablesResponse> {
        let handle = self.session(request.session_id.as_deref())?;
        let session = handle.lock().await;
        let variables = session
            .variables()
            .iter()
            .map(|(name, value)| VariableSummary {
                name: name.clone(),
                type_name: value.type_name(),
            })
            .collect();
        Ok(ListVariablesResponse { variables })
    }

    /// Replaces the session answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn set_answer(&self, request: SetAnswerRequest) -> Result<AnswerResponse> {
        let handle = self.session(request.session_id.as_deref())?;
        let answer = Answer::new(request.content, request.ready);
        handle.lock().await.set_answer(answer.clone());
        Ok(AnswerResponse { answer })
    }

    /// Returns the session answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn get_answer(&self, request: SessionRequest) -> Result<AnswerResponse> {
        let handle = self.session(request.session_id.as_deref())?;
        let answer = handle.lock().await.answer().clone();
        Ok(AnswerResponse { answer })
    }

    /// Creates a session, or returns the live one with the same id.
    pub async fn create_session(&self, request: SessionRequest) -> SessionResponse {
        let handle = self.registry().create_session(request.session_id);
        let created_at = handle.lock().await.created_at();
        SessionResponse {
            session_id: handle.id().to_string(),
            created_at,
        }
    }

    /// Reports a session snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn get_session_info(&self, request: SessionRequest) -> Result<SessionInfoResponse> {
        let handle = self.session(request.session_id.as_deref())?;
        let session = handle.lock().await;
        Ok(SessionInfoResponse {
            session: session.info(handle.last_activity_ms()),
        })
    }

    /// Resets a session's contents, keeping it registered.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn clear_session(&self, request: SessionRequest) -> Result<SessionResponse> {
        let handle = self.session(request.session_id.as_deref())?;
        let mut session = handle.lock().await;
        session.clear();
        tracing::info!(session = handle.id(), "session cleared");
        Ok(SessionResponse {
            session_id: handle.id().to_string(),
            created_at: session.created_at(),
        })
    }

    /// Suggests a decomposition strategy for a context.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` or `ContextNotFound`.
    pub async fn suggest_strategy(&self, request: ContextRequest) -> Result<SuggestionResponse> {
        let context = self
            .context(request.session_id.as_deref(), &request.context_id)
            .await?;
        Ok(SuggestionResponse {
            suggestion: suggest_strategy(context.text(), context.metadata.structure),
            context_id: request.context_id,
        })
    }

    /// Computes text statistics for a context.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` or `ContextNotFound`.
    pub async fn get_statistics(&self, request: ContextRequest) -> Result<StatisticsResponse> {
        let context = self
            .context(request.session_id.as_deref(), &request.context_id)
            .await?;
        Ok(StatisticsResponse {
            structure: context.metadata.structure,
            statistics: compute_statistics(context.text()),
            context_id: request.context_id,
        })
    }

    /// Returns the retained execution records, most recent last.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`.
    pub async fn get_execution_history(&self, request: HistoryRequest) -> Result<HistoryResponse> {
        let handle = self.session(request.session_id.as_deref())?;
        let session = handle.lock().await;
        let total = session.history().len();
        let skip = request.limit.map_or(0, |limit| total.saturating_sub(limit));
        Ok(HistoryResponse {
            total,
            history: session.history().iter().skip(skip).cloned().collect(),
        })
    }

    /// Aggregates a local directory and loads it as a context.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, or `IoError` when the directory cannot be
    /// read.
    pub async fn ingest_documents(&self, request: IngestRequest) -> Result<IngestResponse> {
        let aggregator = request
            .extensions
            .map_or_else(DirectoryAggregator::default, DirectoryAggregator::with_extensions);
        let handle = self.session(request.session_id.as_deref())?;
        let mut session = handle.lock().await;
        let report = ingest_documents(
            &mut session,
            &aggregator,
            Path::new(&request.path),
            &request.context_id,
        )?;
        Ok(IngestResponse { report })
    }

    fn session(&self, id: Option<&str>) -> Result<SessionHandle> {
        self.registry().resolve(id)
    }

    /// Looks up a context under the session lock. The returned snapshot
    /// stays valid if the context is replaced afterwards.
    async fn context(&self, session_id: Option<&str>, context_id: &str) -> Result<Arc<Context>> {
        let handle = self.session(session_id)?;
        let session = handle.lock().await;
        session.context(context_id)
    }
}

fn parse<T: DeserializeOwned>(arguments: serde_json::Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| CommandError::InvalidArgument(e.to_string()).into())
}

fn respond<T: Serialize>(response: T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(response)?)
}

fn parse_strategy(name: Option<&str>) -> Result<Strategy> {
    name.map_or_else(|| Ok(Strategy::default()), str::parse)
}
