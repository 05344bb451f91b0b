//! Core data model for plcgen.
//!
//! Knowledge chunks, per-session pipeline state, and the session record
//! that owns it.

mod chunk;
mod session;
mod state;

pub use chunk::Chunk;
pub use session::Session;
pub use state::{Artifact, Clarification, CodeVersion, Phase, PipelineState};
