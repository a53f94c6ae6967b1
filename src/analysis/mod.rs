//! Structure detection, text statistics and strategy suggestion.
//!
//! Everything here is a pure function of its input text.

pub mod stats;
pub mod structure;

pub use stats::{StrategySuggestion, TextStatistics, compute_statistics, suggest_strategy};
pub use structure::detect_structure;
