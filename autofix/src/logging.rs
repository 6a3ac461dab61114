//! Diagnostic tracing for pipeline runs.
//!
//! Tracing output goes to stderr and is controlled by `RUST_LOG`. It is never
//! part of the run's result: callers get a structured `RunResult` on stdout
//! (CLI) or in the response body (server), independent of log verbosity.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset, which still surfaces
/// rejected external patches and pull-request fallbacks.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=autofix=debug autofix run ./repo "fix division by zero"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
