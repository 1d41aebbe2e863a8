//! Logging init for the CLI: structured events to stderr.

use tracing_subscriber::EnvFilter;

/// Default filter for a verbosity level when `RUST_LOG` is unset.
pub fn default_filter(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "info,galleryzip=debug",
    }
}

/// Initialize logging to stderr. `RUST_LOG` overrides the verbosity flags.
/// Does nothing if a global subscriber is already installed.
pub fn init_logging(verbose: u8, quiet: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
