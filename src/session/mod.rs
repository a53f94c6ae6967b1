//! Sessions and the registry that owns them.
//!
//! A [`Session`] is the unit of isolation: it holds loaded contexts,
//! variables, the answer and execution history. The [`SessionRegistry`]
//! owns every session identity and evicts sessions that sit idle past the
//! configured timeout or that must make room at capacity.

mod registry;
mod state;

pub use registry::{SessionHandle, SessionRegistry};
pub use state::{ContextSummary, Session, SessionInfo};
