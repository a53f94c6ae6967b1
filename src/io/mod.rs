//! I/O utilities for the context engine.
//!
//! Provides char/byte offset conversion for offset-exact text handling
//! and file reading with memory mapping for directory ingestion.

pub mod reader;
pub mod unicode;

pub use reader::{MAX_INGEST_FILE_BYTES, load_text, read_file};
pub use unicode::{CharIndex, char_len, find_char_boundary, split_lines, truncate_chars};
