//! Relevance scoring: rank chunks by keyword overlap with a query.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::Chunk;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9_]+").expect("token pattern is valid"));

/// A chunk and how well it matched, alive only within one retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: usize,
}

/// Lower-case `query` and pull out its runs of ASCII letters, digits and underscores.
pub fn tokenize(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Score every chunk against `query` and return the best `top_k`.
///
/// A chunk's score is the sum, over query tokens, of non-overlapping
/// occurrences of the token in its lower-cased content. Zero-score chunks
/// are dropped. Ties keep the order the chunks were given in.
pub fn score<'a>(query: &str, chunks: &'a [Chunk], top_k: usize) -> Vec<ScoredChunk<'a>> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredChunk<'a>> = chunks
        .iter()
        .filter_map(|chunk| {
            let content = chunk.content.to_lowercase();
            let score: usize = tokens
                .iter()
                .map(|token| content.matches(token.as_str()).count())
                .sum();
            (score > 0).then_some(ScoredChunk { chunk, score })
        })
        .collect();

    // `sort_by` is stable, so equal scores keep load order.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(top_k);
    scored
}
