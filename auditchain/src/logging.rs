//! Logging initialization
//!
//! Filter directives come from `AUDITCHAIN_LOG`, then `RUST_LOG`, then `info`.
//! Output goes to stderr so `verify --json` keeps stdout machine-readable.

use tracing_subscriber::EnvFilter;

/// Primary filter variable
pub const LOG_ENV: &str = "AUDITCHAIN_LOG";

/// Filter used when no variable is set
pub const DEFAULT_FILTER: &str = "info";

/// Resolve the active filter directives.
pub fn filter_directives() -> String {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string())
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed or the directives do not parse.
pub fn init() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_new(filter_directives())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}
