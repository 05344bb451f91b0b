//! Knowledge base: local reference documents used to ground generation.
//!
//! A directory of text files is split into paragraph chunks once, scored
//! against a query by keyword overlap, and the best hits are rendered into
//! a context block for the prompt.

mod compose;
mod score;
mod store;

pub use score::score;
pub use store::ChunkStore;

use compose::compose;

/// Retrieve the best `top_k` chunks for `query` and render them as prompt context.
///
/// Empty when nothing matches.
pub fn context_for(store: &ChunkStore, query: &str, top_k: usize) -> String {
    let hits = score(query, store.chunks(), top_k);
    tracing::debug!(query_len = query.len(), hits = hits.len(), "retrieved knowledge context");
    compose(&hits)
}
