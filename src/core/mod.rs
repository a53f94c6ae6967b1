//! Core domain models for the context engine.
//!
//! This module contains the fundamental data structures used throughout
//! the engine: contexts, chunks, variable values, answers and execution
//! records. These are plain domain models with no I/O dependencies.

pub mod chunk;
pub mod context;
pub mod record;
pub mod value;

pub use chunk::{Chunk, ChunkMetadata};
pub use context::{Context, ContextMetadata, Structure};
pub use record::{Answer, ExecutionRecord};
pub use value::Value;

pub(crate) use context::current_timestamp_ms;
