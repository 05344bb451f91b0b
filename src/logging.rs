//! Tracing setup.
//!
//! Logs go to stderr so stdout stays clean for generated artifacts.
//! `RUST_LOG` wins over `--verbose` when set.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. Errors if one is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose { "plcgen=debug,info" } else { "plcgen=warn,warn" }
}
