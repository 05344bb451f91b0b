//! Generation: calling the external text generator.
//!
//! A `TextGenerator` turns a request into text. The stage runner wraps one
//! call with retry and turns failure into a displayable result, and the
//! extractor pulls fenced code out of the reply.

mod extract;
mod generator;
mod runner;
#[cfg(test)]
pub mod testing;

pub use extract::{code_or_text, first_fenced_block};
pub use generator::{
    CommandGenerator, GenerationError, GenerationRequest, RequestFormat, TextGenerator,
};
pub use runner::{StageResult, run_stage};
