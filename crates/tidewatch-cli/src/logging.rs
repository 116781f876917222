//! Logging setup using `tracing-subscriber`.
//!
//! Logs go to stderr so that `--json` output on stdout stays parseable.
//! `RUST_LOG` takes precedence over the verbosity flag.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map the `-v` count to a default level.
///
/// - 0: warn
/// - 1 (`-v`): debug
/// - 2+ (`-vv`): trace
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Safe to call once per process.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity).as_str().to_lowercase()));

    // A second init (as in tests) is not an error worth reporting
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
