//! Ledger configuration
//!
//! Every setting is read from an `AUDITCHAIN_*` variable. Each one also has a
//! legacy unprefixed name that is still honoured with a warning.

use std::time::Duration;

/// Default database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/auditchain.db";

/// Read `primary`, falling back to the legacy `legacy` name.
///
/// A warning is logged when only the legacy name is set.
///
/// # Example
/// ```
/// use auditchain::config::get_env_with_fallback;
///
/// let url = get_env_with_fallback("AUDITCHAIN_DATABASE_URL", "DATABASE_URL");
/// ```
pub fn get_env_with_fallback(primary: &str, legacy: &str) -> Option<String> {
    match (std::env::var(primary), std::env::var(legacy)) {
        (Ok(value), _) => Some(value),
        (Err(_), Ok(value)) => {
            tracing::warn!(
                legacy,
                primary,
                "Legacy environment variable in use, rename it"
            );
            Some(value)
        }
        (Err(_), Err(_)) => None,
    }
}

/// Like [`get_env_with_fallback`], with a default when neither name is set.
pub fn get_env_with_fallback_or(primary: &str, legacy: &str, default: &str) -> String {
    get_env_with_fallback(primary, legacy).unwrap_or_else(|| default.to_owned())
}

/// Like [`get_env_with_fallback`], parsed into `T`. Unset or unparsable values yield `default`.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    primary: &str,
    legacy: &str,
    default: T,
) -> T {
    match get_env_with_fallback(primary, legacy).map(|raw| raw.parse::<T>()) {
        Some(Ok(value)) => value,
        _ => default,
    }
}

/// Ledger storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// SQLite database URL
    pub database_url: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// How long a writer waits for the tenant lock before failing
    pub lock_timeout: Duration,
    /// How long a caller waits for a pooled connection
    pub acquire_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 8,
            lock_timeout: Duration::from_millis(5_000),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl LedgerConfig {
    /// Load ledger configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let database_url =
            get_env_with_fallback_or("AUDITCHAIN_DATABASE_URL", "DATABASE_URL", DEFAULT_DATABASE_URL);
        let max_connections = get_env_with_fallback_parse(
            "AUDITCHAIN_DB_MAX_CONNECTIONS",
            "DB_MAX_CONNECTIONS",
            defaults.max_connections,
        );
        let lock_timeout_ms = get_env_with_fallback_parse(
            "AUDITCHAIN_LOCK_TIMEOUT_MS",
            "LOCK_TIMEOUT_MS",
            defaults.lock_timeout.as_millis() as u64,
        );
        let acquire_timeout_secs = get_env_with_fallback_parse(
            "AUDITCHAIN_ACQUIRE_TIMEOUT_SECS",
            "ACQUIRE_TIMEOUT_SECS",
            defaults.acquire_timeout.as_secs(),
        );

        Self {
            database_url,
            max_connections: max_connections.max(1),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
        }
    }

    /// Override the database URL (CLI flag takes precedence over env).
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }
}
