mod analysis;
mod cli;
mod config;
mod generate;
mod knowledge;
mod logging;
mod model;
mod pipeline;
mod storage;

use std::process;

use clap::Parser;

use config::Config;
use storage::Storage;

fn main() {
    let cli = cli::Cli::parse();

    if let Err(e) = logging::init_tracing(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let root = Storage::default_root().unwrap_or_else(|| {
        eprintln!("Could not determine home directory.");
        process::exit(1);
    });

    let storage = match Storage::new(root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize storage: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(cli, &config, &storage) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
