//! Document ingestion.
//!
//! Fetching a repository and walking its files happen outside the engine,
//! behind [`DocumentFetcher`] and [`FileAggregator`]. The engine only loads
//! the aggregated text as a context and returns a table of contents
//! pointing into it.

mod directory;

pub use directory::{DEFAULT_EXTENSIONS, DirectoryAggregator};

use crate::core::ContextMetadata;
use crate::error::{IoError, Result};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result of fetching a document repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Whether the fetch succeeded.
    pub success: bool,
    /// Local directory holding the fetched files.
    pub output_dir: PathBuf,
    /// Diagnostic text from the fetcher.
    pub diagnostics: String,
}

/// Downloads a document repository to a local directory.
pub trait DocumentFetcher: Send + Sync {
    /// Fetches `repository_url`.
    fn fetch(&self, repository_url: &str) -> FetchOutcome;
}

/// One file in an [`Aggregation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Path relative to the aggregated root, `/`-separated.
    pub relative_path: String,
    /// First top-level heading, or the file stem.
    pub title: String,
    /// File size in bytes.
    pub size: u64,
    /// Number of lines.
    pub line_count: usize,
    /// Char offset of the file's section in the aggregated content.
    pub start_offset: usize,
}

/// Ordered files plus their concatenated content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// Files in content order.
    pub files: Vec<FileEntry>,
    /// Concatenated content.
    pub content: String,
}

/// Enumerates and concatenates files under a root directory.
pub trait FileAggregator: Send + Sync {
    /// Aggregates the files under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be read.
    fn aggregate(&self, root: &Path) -> Result<Aggregation>;
}

/// Metadata and table of contents of an ingested context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Id the content was loaded under.
    pub context_id: String,
    /// Metadata of the loaded context.
    pub metadata: ContextMetadata,
    /// One entry per aggregated file.
    pub toc: Vec<FileEntry>,
}

/// Aggregates `root` and loads the result into `session` as `context_id`.
///
/// # Errors
///
/// Returns an error if aggregation fails.
pub fn ingest_documents(
    session: &mut Session,
    aggregator: &dyn FileAggregator,
    root: &Path,
    context_id: &str,
) -> Result<IngestReport> {
    let aggregation = aggregator.aggregate(root)?;
    let context = session.load_context(context_id, aggregation.content);
    tracing::info!(
        session = session.id(),
        context = context_id,
        files = aggregation.files.len(),
        length = context.metadata.length,
        "ingested documents"
    );
    Ok(IngestReport {
        context_id: context_id.to_string(),
        metadata: context.metadata.clone(),
        toc: aggregation.files,
    })
}

/// Fetches `repository_url` and returns the local directory.
///
/// # Errors
///
/// Returns [`IoError::FetchFailed`] with the fetcher's diagnostics when the
/// fetch did not succeed.
pub fn fetch_documents(fetcher: &dyn DocumentFetcher, repository_url: &str) -> Result<PathBuf> {
    let outcome = fetcher.fetch(repository_url);
    if outcome.success {
        Ok(outcome.output_dir)
    } else {
        Err(IoError::FetchFailed {
            url: repository_url.to_string(),
            reason: outcome.diagnostics,
        }
        .into())
    }
}
