//! Local directory aggregation.

use super::{Aggregation, FileAggregator, FileEntry};
use crate::error::{IoError, Result};
use crate::io::{char_len, read_file, split_lines};
use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// Default extensions collected by [`DirectoryAggregator`].
pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "txt", "rst"];

fn title_regex() -> &'static Regex {
    static_regex!(TITLE, r"(?m)^#[ \t]+(\S[^\n]*)$")
}

/// Collects text files under a directory in path order.
///
/// Hidden directories are skipped, and so are files that cannot be read as
/// UTF-8. Each file is rendered as a marker line naming its relative path
/// followed by its text.
///
/// # Examples
///
/// ```
/// use rlm_context::ingest::{DirectoryAggregator, FileAggregator};
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("guide.md"), "# Guide\nbody\n").unwrap();
///
/// let aggregation = DirectoryAggregator::default().aggregate(dir.path()).unwrap();
/// assert_eq!(aggregation.files[0].title, "Guide");
/// assert!(aggregation.content.contains("body"));
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryAggregator {
    extensions: Vec<String>,
}

impl Default for DirectoryAggregator {
    fn default() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS.iter().copied())
    }
}

impl DirectoryAggregator {
    /// Creates an aggregator collecting files with the given extensions.
    #[must_use]
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

impl FileAggregator for DirectoryAggregator {
    fn aggregate(&self, root: &Path) -> Result<Aggregation> {
        if !root.is_dir() {
            return Err(IoError::FileNotFound {
                path: root.to_string_lossy().to_string(),
            }
            .into());
        }

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        let mut aggregation = Aggregation::default();
        let mut offset = 0;

        for entry in walker {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() || !self.accepts(entry.path()) {
                continue;
            }

            let text = match read_file(entry.path()) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };

            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or_else(|_| entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let title = title_regex()
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .map_or_else(
                    || {
                        entry
                            .path()
                            .file_stem()
                            .map_or_else(String::new, |s| s.to_string_lossy().to_string())
                    },
                    |m| m.as_str().trim().to_string(),
                );

            let section = format!("<!-- file: {relative} -->\n{}\n\n", text.trim_end());
            aggregation.files.push(FileEntry {
                relative_path: relative,
                title,
                size: text.len() as u64,
                line_count: split_lines(&text).len(),
                start_offset: offset,
            });
            offset += char_len(&section);
            aggregation.content.push_str(&section);
        }

        tracing::debug!(
            root = %root.display(),
            files = aggregation.files.len(),
            "aggregated directory"
        );
        Ok(aggregation)
    }
}
