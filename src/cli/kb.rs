//! Knowledge-base commands: search, stats.

use std::collections::BTreeMap;

use clap::Subcommand;

use crate::{
    config::Config,
    knowledge::{ChunkStore, score},
};

#[derive(Debug, Subcommand)]
pub enum KbCommand {
    /// Show the chunks that would ground a prompt for `query`.
    Search {
        query: String,

        /// Chunks to return (defaults to the configured `top-k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Count files and chunks in the knowledge directory.
    Stats,
}

pub(super) fn run(config: &Config, command: KbCommand) -> Result<(), String> {
    let dir = config
        .knowledge_dir()
        .ok_or("could not determine knowledge directory")?;
    let store = ChunkStore::new(dir);

    match command {
        KbCommand::Search { query, top_k } => {
            cmd_search(&store, &query, top_k.unwrap_or(config.top_k))
        }
        KbCommand::Stats => {
            cmd_stats(&store);
            Ok(())
        }
    }
}

fn cmd_search(store: &ChunkStore, query: &str, top_k: usize) -> Result<(), String> {
    if top_k == 0 {
        return Err("--top-k must be at least 1".to_string());
    }
    let hits = score(query, store.chunks(), top_k);
    if hits.is_empty() {
        println!("No matching chunks");
        return Ok(());
    }
    for hit in &hits {
        println!("[{}] {}", hit.score, hit.chunk.label());
        println!("{}\n", hit.chunk.content);
    }
    Ok(())
}

fn cmd_stats(store: &ChunkStore) {
    let mut per_file: BTreeMap<String, usize> = BTreeMap::new();
    for chunk in store.chunks() {
        *per_file
            .entry(chunk.source_path.display().to_string())
            .or_default() += 1;
    }

    println!("Knowledge directory: {}", store.root().display());
    println!(
        "{} chunk(s) from {} file(s)",
        store.chunks().len(),
        per_file.len()
    );
    for (path, count) in &per_file {
        println!("  {count:>4}  {path}");
    }
}
