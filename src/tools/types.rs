//! Request and response types of the tool-call boundary.
//!
//! Request fields are snake_case and optional fields take the documented
//! defaults. Responses are serialized into JSON objects, to which the
//! dispatcher adds `"success": true`.

use crate::analysis::{StrategySuggestion, TextStatistics};
use crate::chunking::{DEFAULT_CHUNK_SIZE, DEFAULT_LINES_PER_CHUNK, DEFAULT_OVERLAP, StrategyInfo};
use crate::core::{Answer, Chunk, ChunkMetadata, ContextMetadata, ExecutionRecord, Structure};
use crate::ingest::IngestReport;
use crate::search::{DEFAULT_CONTEXT_CHARS, DEFAULT_MAX_RESULTS, SearchMatch};
use crate::session::SessionInfo;
use serde::{Deserialize, Serialize};

const fn default_true() -> bool {
    true
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

const fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

const fn default_lines_per_chunk() -> usize {
    DEFAULT_LINES_PER_CHUNK
}

const fn default_context_chars() -> usize {
    DEFAULT_CONTEXT_CHARS
}

const fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// `load_context` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadContextRequest {
    /// Text to load.
    pub context: String,
    /// Id to load it under; an existing context is replaced.
    pub context_id: String,
    /// Target session; the default session when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `load_context` result.
#[derive(Debug, Clone, Serialize)]
pub struct LoadContextResponse {
    /// Session the context was loaded into.
    pub session_id: String,
    /// Loaded context id.
    pub context_id: String,
    /// Computed metadata.
    pub metadata: ContextMetadata,
}

/// Arguments naming a context in a session.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextRequest {
    /// Context id.
    pub context_id: String,
    /// Session id; the default session when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `get_context_info` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextInfoRequest {
    /// Context id.
    pub context_id: String,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Whether to include a leading preview.
    #[serde(default = "default_true")]
    pub include_preview: bool,
    /// Preview length in chars; the configured default when absent.
    #[serde(default)]
    pub preview_length: Option<usize>,
}

/// `get_context_info` result.
#[derive(Debug, Clone, Serialize)]
pub struct ContextInfoResponse {
    /// Context id.
    pub context_id: String,
    /// Load timestamp in Unix milliseconds.
    pub created_at: i64,
    /// Computed metadata.
    pub metadata: ContextMetadata,
    /// Leading text, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Whether the preview is shorter than the context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_truncated: Option<bool>,
}

/// Unit of `read_context` offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// Char offsets.
    #[default]
    Chars,
    /// 0-based line indices.
    Lines,
}

/// `read_context` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadContextRequest {
    /// Context id.
    pub context_id: String,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Inclusive start.
    #[serde(default)]
    pub start: usize,
    /// Exclusive end; the end of the context when absent.
    #[serde(default)]
    pub end: Option<usize>,
    /// Offset unit.
    #[serde(default)]
    pub mode: ReadMode,
}

/// `read_context` result.
#[derive(Debug, Clone, Serialize)]
pub struct ReadContextResponse {
    /// Requested text.
    pub content: String,
    /// Its length in chars.
    pub length: usize,
}

/// `decompose_context` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct DecomposeRequest {
    /// Context id.
    pub context_id: String,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Strategy name; `fixed_size` when absent.
    #[serde(default)]
    pub strategy: Option<String>,
    /// Chunk size in chars.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap: chars for fixed-size, lines for by-lines.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Lines per chunk.
    #[serde(default = "default_lines_per_chunk")]
    pub lines_per_chunk: usize,
    /// Split pattern for by-regex.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Whether to include chunk text.
    #[serde(default)]
    pub return_content: bool,
}

/// A chunk as reported by `decompose_context`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkView {
    /// Chunk index.
    pub index: usize,
    /// Start char offset.
    pub start_offset: usize,
    /// End char offset.
    pub end_offset: usize,
    /// Length in chars.
    pub length: usize,
    /// Chunk text, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Strategy metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChunkMetadata>,
}

impl ChunkView {
    /// Full view of `chunk`, with content if requested.
    #[must_use]
    pub fn of(chunk: &Chunk, with_content: bool) -> Self {
        Self {
            content: with_content.then(|| chunk.content.clone()),
            metadata: chunk.metadata.clone(),
            ..Self::summary(chunk)
        }
    }

    /// Offsets and length only.
    #[must_use]
    pub const fn summary(chunk: &Chunk) -> Self {
        Self {
            index: chunk.index,
            start_offset: chunk.start_offset,
            end_offset: chunk.end_offset,
            length: chunk.end_offset.saturating_sub(chunk.start_offset),
            content: None,
            metadata: None,
        }
    }
}

/// `decompose_context` result.
#[derive(Debug, Clone, Serialize)]
pub struct DecomposeResponse {
    /// Context id.
    pub context_id: String,
    /// Strategy used.
    pub strategy: String,
    /// Number of chunks produced.
    pub total_chunks: usize,
    /// Chunks, or the first few when truncated.
    pub chunks: Vec<ChunkView>,
    /// Whether the chunk list was cut to fit the response budget.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    /// How to fetch the rest when truncated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// `get_chunks` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct GetChunksRequest {
    /// Context id.
    pub context_id: String,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// 1 to 50 chunk indices.
    pub chunk_indices: Vec<usize>,
    /// Strategy name; `fixed_size` when absent.
    #[serde(default)]
    pub strategy: Option<String>,
    /// Chunk size in chars.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Lines per chunk.
    #[serde(default = "default_lines_per_chunk")]
    pub lines_per_chunk: usize,
    /// Split pattern for by-regex.
    #[serde(default)]
    pub pattern: Option<String>,
}

/// `get_chunks` result.
#[derive(Debug, Clone, Serialize)]
pub struct GetChunksResponse {
    /// Number of indices requested.
    pub requested: usize,
    /// Number of chunks returned.
    pub returned: usize,
    /// Chunks at valid indices, in request order.
    pub chunks: Vec<Chunk>,
}

/// `search_context` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    /// Context id.
    pub context_id: String,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Regex pattern.
    pub pattern: String,
    /// Regex flags.
    #[serde(default)]
    pub flags: String,
    /// Chars of context per side.
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
    /// Match cap.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Whether to compute line numbers.
    #[serde(default = "default_true")]
    pub include_line_numbers: bool,
}

/// `search_context` result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Number of matches returned.
    pub total_matches: usize,
    /// Matches in ascending offset order.
    pub matches: Vec<SearchMatch>,
}

/// `find_all` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct FindAllRequest {
    /// Context id.
    pub context_id: String,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Substring to find.
    pub substring: String,
    /// Whether matching is case-sensitive.
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

/// `find_all` result.
#[derive(Debug, Clone, Serialize)]
pub struct FindAllResponse {
    /// Number of occurrences.
    pub count: usize,
    /// Char offsets of the occurrences.
    pub offsets: Vec<usize>,
}

/// `execute_code` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// Script source.
    pub code: String,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `execute_code` result. Script failures are reported here, not as tool
/// failures.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    /// Whether the script completed.
    pub success: bool,
    /// Captured output.
    pub output: String,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    /// Wall-clock duration.
    pub duration_ms: u64,
}

/// `set_variable` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct SetVariableRequest {
    /// Variable name.
    pub name: String,
    /// JSON value.
    pub value: serde_json::Value,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `get_variable` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct VariableRequest {
    /// Variable name.
    pub name: String,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `set_variable` / `get_variable` result.
#[derive(Debug, Clone, Serialize)]
pub struct VariableResponse {
    /// Variable name.
    pub name: String,
    /// Value after the call.
    pub value: crate::core::Value,
}

/// One entry of `list_variables`.
#[derive(Debug, Clone, Serialize)]
pub struct VariableSummary {
    /// Variable name.
    pub name: String,
    /// Value type name.
    #[serde(rename = "type")]
    pub type_name: &'static str,
}

/// `list_variables` result.
#[derive(Debug, Clone, Serialize)]
pub struct ListVariablesResponse {
    /// Variables in name order.
    pub variables: Vec<VariableSummary>,
}

/// Arguments naming only a session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionRequest {
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `set_answer` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct SetAnswerRequest {
    /// Answer text.
    pub content: String,
    /// Whether the answer is final.
    #[serde(default)]
    pub ready: bool,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `set_answer` / `get_answer` result.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    /// Current answer.
    pub answer: Answer,
}

/// `create_session` / `clear_session` result.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    /// Session id.
    pub session_id: String,
    /// Creation timestamp in Unix milliseconds.
    pub created_at: i64,
}

/// `get_session_info` result.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfoResponse {
    /// Session snapshot.
    pub session: SessionInfo,
}

/// `suggest_strategy` result.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionResponse {
    /// Context id.
    pub context_id: String,
    /// Suggested strategy.
    pub suggestion: StrategySuggestion,
}

/// `get_statistics` result.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsResponse {
    /// Context id.
    pub context_id: String,
    /// Detected structure.
    pub structure: Structure,
    /// Statistics.
    pub statistics: TextStatistics,
}

/// `get_execution_history` arguments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryRequest {
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Most recent records to return; all retained when absent.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// `get_execution_history` result.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    /// Number of retained records.
    pub total: usize,
    /// Records, oldest first.
    pub history: Vec<ExecutionRecord>,
}

/// `ingest_documents` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    /// Local directory to aggregate.
    pub path: String,
    /// Context id to load the aggregate under.
    pub context_id: String,
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// File extensions to collect; the defaults when absent.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

/// `ingest_documents` result.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    /// Ingestion report.
    #[serde(flatten)]
    pub report: IngestReport,
}

/// `list_tools` result.
#[derive(Debug, Clone, Serialize)]
pub struct ToolListResponse {
    /// Tool names.
    pub tools: Vec<&'static str>,
    /// Decomposition strategies `decompose_context` accepts.
    pub strategies: Vec<StrategyInfo>,
}
