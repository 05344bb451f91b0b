//! Chunk store: load a knowledge directory into paragraph chunks.
//!
//! Walks the tree once, splits each text file on blank lines, and keeps
//! the result for the life of the store.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, OnceLock},
};

use ignore::WalkBuilder;
use regex::Regex;
use tracing::{debug, info};

use crate::model::Chunk;

/// One or more blank lines: a newline, optional whitespace, and another newline.
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"));

/// A knowledge directory and its chunks, loaded on first access.
///
/// Safe to share between sessions: the load runs at most once and later
/// callers get the cached chunks without touching disk.
#[derive(Debug)]
pub struct ChunkStore {
    root: PathBuf,
    chunks: OnceLock<Vec<Chunk>>,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunks: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All chunks under the root, loading them on first call.
    pub fn chunks(&self) -> &[Chunk] {
        self.chunks.get_or_init(|| {
            let chunks = load(&self.root);
            info!(
                root = %self.root.display(),
                chunks = chunks.len(),
                "loaded knowledge base"
            );
            chunks
        })
    }

    /// Whether the load has already happened.
    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.chunks.get().is_some()
    }
}

/// Walk `root` and split every readable text file into chunks.
///
/// A missing root yields no chunks. Files that can't be read or aren't
/// valid UTF-8 are skipped without error. Files are visited in file-name
/// order so chunk order is deterministic.
pub fn load(root: &Path) -> Vec<Chunk> {
    if !root.is_dir() {
        debug!(root = %root.display(), "knowledge directory missing");
        return Vec::new();
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false) // Reference material: read everything, hidden or ignored.
        .sort_by_file_name(Ord::cmp)
        .build();

    let mut chunks = Vec::new();
    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let Some(text) = read_text(path) else {
            debug!(path = %path.display(), "skipping unreadable or non-text file");
            continue;
        };
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        chunks.extend(
            split_paragraphs(&text)
                .enumerate()
                .map(|(chunk_index, content)| Chunk {
                    source_path: relative.clone(),
                    chunk_index,
                    content: content.to_string(),
                }),
        );
    }
    chunks
}

/// Read a file as UTF-8 text, or `None` if it can't be read or decoded.
fn read_text(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    String::from_utf8(bytes).ok()
}

/// Split text on blank lines into trimmed, non-empty paragraphs.
fn split_paragraphs(text: &str) -> impl Iterator<Item = &str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
}
