//! Context composition: render retrieved chunks for a prompt.

use super::score::ScoredChunk;

/// Format chunks as labelled blocks separated by blank lines.
///
/// Returns an empty string for no chunks; callers treat that as "no context"
/// and leave the context section out of their prompt.
pub fn compose(hits: &[ScoredChunk<'_>]) -> String {
    hits.iter()
        .map(|hit| format!("Source: {}\n{}", hit.chunk.label(), hit.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
