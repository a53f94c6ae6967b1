//! CLI command implementations.
//!
//! `serve` drives a [`ToolService`] over newline-delimited JSON, `call` runs
//! one tool, `tools` lists them.

use crate::cli::output::{OutputFormat, format_json_line, format_response, format_tool_list};
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Error, Result};
use crate::tools::{ToolService, failure_response};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Requests buffered per session lane before the reader waits.
const LANE_CAPACITY: usize = 64;

/// Responses buffered ahead of the writer.
const RESPONSE_CAPACITY: usize = 256;

/// One request line of the `serve` protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    /// Caller correlation id, echoed in the response.
    #[serde(default)]
    pub id: Option<Value>,
    /// Tool name.
    pub tool: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Value,
}

/// Executes the CLI command.
///
/// # Returns
///
/// Result with output string on success. `serve` writes its responses
/// directly and returns an empty string.
///
/// # Errors
///
/// Returns an error for an invalid configuration, unreadable input, or a
/// failed write to stdout. Tool failures are part of the output.
pub async fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Tools => Ok(format_tool_list(&ToolService::list_tools(), format)),
        Commands::Call { tool, arguments } => {
            let arguments = read_arguments(arguments.as_deref()).await?;
            let service = ToolService::new(cli.limits.to_config())?;
            let response = service.dispatch(tool, arguments).await;
            service.shutdown();
            Ok(format_response(&response, format))
        }
        Commands::Serve => {
            let service = Arc::new(ToolService::new(cli.limits.to_config())?);
            let stdin = BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();

            let outcome = tokio::select! {
                result = serve(Arc::clone(&service), stdin, stdout) => result.map(|served| {
                    tracing::info!(served, "input closed");
                }),
                signal = tokio::signal::ctrl_c() => signal.map_err(Error::from).map(|()| {
                    tracing::info!("interrupted");
                }),
            };

            service.shutdown();
            outcome.map(|()| String::new())
        }
    }
}

/// Answers every request line from `reader` with one JSON line on
/// `writer`, until end of input. Blank lines are skipped.
///
/// Requests are routed to one lane per `session_id` (a missing id and the
/// default id share a lane). A lane runs its requests in arrival order,
/// while lanes run concurrently, so responses from different sessions can
/// arrive out of input order; callers correlate them by `id`. A handler
/// that panics is answered with an `InternalError` failure and its lane
/// keeps serving.
///
/// Returns the number of responses written.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub async fn serve<R, W>(service: Arc<ToolService>, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (responses, mut outbox) = mpsc::channel::<Value>(RESPONSE_CAPACITY);

    let read_side = async move {
        let default_lane = service.config().registry.default_session_id.clone();
        let mut lanes: HashMap<String, mpsc::Sender<ToolRequest>> = HashMap::new();
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let request = match parse_request(&line) {
                Ok(request) => request,
                Err(failure) => {
                    if responses.send(failure).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let key = lane_key(&request, &default_lane);
            let lane = lanes.entry(key).or_insert_with_key(|key| {
                tracing::debug!(lane = %key, "opening session lane");
                spawn_lane(Arc::clone(&service), responses.clone())
            });
            if let Err(mpsc::error::SendError(request)) = lane.send(request).await {
                let err: Error = CommandError::Internal("session lane closed".to_string()).into();
                let failure = with_id(failure_response(&err), request.id);
                if responses.send(failure).await.is_err() {
                    break;
                }
            }
        }
        Ok::<(), Error>(())
    };

    let write_side = async {
        let mut written = 0;
        while let Some(response) = outbox.recv().await {
            writer
                .write_all(format_json_line(&response).as_bytes())
                .await?;
            writer.flush().await?;
            written += 1;
        }
        Ok::<usize, Error>(written)
    };

    let ((), written) = tokio::try_join!(read_side, write_side)?;
    Ok(written)
}

/// Runs one lane's requests in order until its sender is dropped.
fn spawn_lane(service: Arc<ToolService>, responses: mpsc::Sender<Value>) -> mpsc::Sender<ToolRequest> {
    let (lane, mut queue) = mpsc::channel::<ToolRequest>(LANE_CAPACITY);
    tokio::spawn(async move {
        while let Some(request) = queue.recv().await {
            let ToolRequest {
                id,
                tool,
                arguments,
            } = request;
            let worker = Arc::clone(&service);
            let job = tokio::spawn(async move { worker.dispatch(&tool, arguments).await });
            let response = match job.await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "tool handler panicked");
                    let err: Error = CommandError::Internal(e.to_string()).into();
                    failure_response(&err)
                }
            };
            if responses.send(with_id(response, id)).await.is_err() {
                break;
            }
        }
    });
    lane
}

fn lane_key(request: &ToolRequest, default_lane: &str) -> String {
    request
        .arguments
        .get("session_id")
        .and_then(Value::as_str)
        .unwrap_or(default_lane)
        .to_string()
}

fn parse_request(line: &str) -> std::result::Result<ToolRequest, Value> {
    serde_json::from_str(line).map_err(|e| {
        let err: Error = CommandError::InvalidArgument(format!("malformed request: {e}")).into();
        failure_response(&err)
    })
}

fn with_id(mut response: Value, id: Option<Value>) -> Value {
    if let (Some(id), Some(object)) = (id, response.as_object_mut()) {
        object.insert("id".to_string(), id);
    }
    response
}

async fn read_arguments(raw: Option<&str>) -> Result<Value> {
    let text = match raw {
        None => return Ok(Value::Null),
        Some("-") => {
            let mut buffer = String::new();
            tokio::io::stdin().read_to_string(&mut buffer).await?;
            buffer
        }
        Some(text) => text.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| {
        CommandError::InvalidArgument(format!("arguments are not valid JSON: {e}")).into()
    })
}
