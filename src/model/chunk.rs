//! Chunk: one paragraph of a knowledge-base file.

use std::path::PathBuf;

/// A paragraph-delimited unit of text extracted from one knowledge-base file.
///
/// Identity is `(source_path, chunk_index)`. Chunks are produced by a single
/// load of the knowledge base and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Path of the source file, relative to the knowledge root.
    pub source_path: PathBuf,

    /// Zero-based position of this chunk within its file.
    pub chunk_index: usize,

    /// Trimmed paragraph text.
    pub content: String,
}

impl Chunk {
    /// The `path#index` label used when citing this chunk.
    pub fn label(&self) -> String {
        format!("{}#{}", self.source_path.display(), self.chunk_index)
    }
}
