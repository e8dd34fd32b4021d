//! tracing subscriber setup shared by both binaries.
//!
//! Output always goes to stderr: the special remote's stdout is the protocol
//! channel to git-annex.

use crate::config::LOG_ENV;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Filter precedence: `--debug`, `--verbose`, `$GETEXEC_LOG`, `$RUST_LOG`,
/// then `warn`.
pub fn init(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
