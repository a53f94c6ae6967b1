//! Text file loading for directory ingestion.
//!
//! Small files go through a single buffered read. Files past
//! [`MMAP_THRESHOLD`] are mapped and validated in place, so the only copy
//! made is the final `String`.

#![allow(unsafe_code)]

use crate::error::{IoError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Size from which a file is memory-mapped instead of read (1 MiB).
pub const MMAP_THRESHOLD: u64 = 1 << 20;

/// Largest file a single ingestion will accept (64 MiB).
pub const MAX_INGEST_FILE_BYTES: u64 = 64 << 20;

/// Raw bytes of a file, owned or mapped.
enum TextSource {
    Buffered(Vec<u8>),
    Mapped(Mmap),
}

impl TextSource {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Buffered(bytes) => bytes,
            Self::Mapped(map) => map,
        }
    }
}

fn read_failed(path: &Path, reason: impl ToString) -> IoError {
    IoError::ReadFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn open_source(path: &Path, limit: u64) -> Result<TextSource> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IoError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => read_failed(path, e),
    })?;
    let len = file.metadata().map_err(|e| read_failed(path, e))?.len();

    if len > limit {
        return Err(read_failed(path, format!("{len} bytes exceeds the {limit} byte limit")).into());
    }
    if len < MMAP_THRESHOLD {
        return std::fs::read(path)
            .map(TextSource::Buffered)
            .map_err(|e| read_failed(path, e).into());
    }

    // SAFETY: read-only mapping that never outlives this load
    let map = unsafe { Mmap::map(&file) }.map_err(|e| IoError::MmapFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(TextSource::Mapped(map))
}

/// Loads a UTF-8 text file no larger than `limit` bytes.
///
/// # Errors
///
/// Returns [`IoError::FileNotFound`] for a missing path and
/// [`IoError::ReadFailed`] when the file is too large, unreadable or not
/// UTF-8.
pub fn load_text(path: &Path, limit: u64) -> Result<String> {
    let source = open_source(path, limit)?;
    let text = std::str::from_utf8(source.bytes())
        .map_err(|e| read_failed(path, format!("invalid UTF-8: {e}")))?;
    Ok(text.to_owned())
}

/// Loads a UTF-8 text file under the default ingestion limit.
///
/// # Errors
///
/// See [`load_text`].
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    load_text(path.as_ref(), MAX_INGEST_FILE_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_small_file_is_buffered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\nmünchen\n").unwrap();

        assert!(matches!(
            open_source(&path, MAX_INGEST_FILE_BYTES).unwrap(),
            TextSource::Buffered(_)
        ));
        assert_eq!(read_file(&path).unwrap(), "# Notes\nmünchen\n");
    }

    #[test]
    fn test_large_file_is_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let body = "line\n".repeat(300_000);
        std::fs::write(&path, &body).unwrap();

        assert!(matches!(
            open_source(&path, MAX_INGEST_FILE_BYTES).unwrap(),
            TextSource::Mapped(_)
        ));
        assert_eq!(read_file(&path).unwrap(), body);
    }

    #[test]
    fn test_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "0123456789").unwrap();

        assert!(matches!(
            load_text(&path, 4),
            Err(Error::Io(IoError::ReadFailed { .. }))
        ));
        assert_eq!(load_text(&path, 10).unwrap(), "0123456789");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_file("/nonexistent/path/file.txt"),
            Err(Error::Io(IoError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.dat");
        std::fs::write(&path, [0xFF_u8, 0xFE, 0x00]).unwrap();

        let err = read_file(&path).unwrap_err();
        assert!(err.to_string().contains("invalid UTF-8"));
    }
}
