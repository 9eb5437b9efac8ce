//! CLI module for auditchain
//!
//! Operator entry points for the ledger: schema setup, single appends and
//! chain verification.

pub mod append;
pub mod migrate;
pub mod verify;

use crate::common::error::LedgerResult;
use crate::config::LedgerConfig;
use crate::db::{audit_log::AuditLogStorage, initialize_database};
use clap::{Parser, Subcommand};

/// Tamper-evident audit ledger
#[derive(Parser, Debug)]
#[command(name = "auditchain")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    AUDITCHAIN_DATABASE_URL          Database URL (default: sqlite:data/auditchain.db)
    AUDITCHAIN_DB_MAX_CONNECTIONS    Connection pool size (default: 8)
    AUDITCHAIN_LOCK_TIMEOUT_MS       Tenant lock wait in milliseconds (default: 5000)
    AUDITCHAIN_ACQUIRE_TIMEOUT_SECS  Pool acquire timeout in seconds (default: 30)
    AUDITCHAIN_LOG                   Log filter (default: info)
"#)]
pub struct Cli {
    /// Database URL (overrides AUDITCHAIN_DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and apply migrations
    Migrate(migrate::MigrateArgs),
    /// Append one entry to a tenant's chain
    Append(append::AppendArgs),
    /// Verify a tenant's chain
    Verify(verify::VerifyArgs),
}

impl Cli {
    /// Resolve configuration from the environment and command-line overrides.
    pub fn config(&self) -> LedgerConfig {
        let config = LedgerConfig::from_env();
        match &self.database_url {
            Some(url) => config.with_database_url(url.clone()),
            None => config,
        }
    }
}

/// Open the configured database (migrations applied) as ledger storage.
pub async fn open_storage(config: &LedgerConfig) -> LedgerResult<AuditLogStorage> {
    let pool = initialize_database(config).await?;
    Ok(AuditLogStorage::new(pool))
}
