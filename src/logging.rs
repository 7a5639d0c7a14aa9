//! Logging initialization for querywright.
//!
//! Logs go to stderr so generated SQL and query results on stdout stay
//! machine-readable.

use tracing_subscriber::EnvFilter;

/// Initializes stderr logging with an environment-controlled filter.
///
/// Respects `RUST_LOG`; defaults to `info`.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
