//! migrate subcommand

use crate::config::LedgerConfig;
use clap::Args;

/// Arguments for the migrate subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct MigrateArgs {}

/// Execute the migrate command
pub async fn execute(_args: &MigrateArgs, config: &LedgerConfig) -> Result<(), anyhow::Error> {
    let storage = super::open_storage(config).await?;
    storage.pool().close().await;
    println!("Database ready at {}", config.database_url);
    Ok(())
}
