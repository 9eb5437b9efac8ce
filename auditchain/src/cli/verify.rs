//! verify subcommand

use crate::audit::verifier::{ChainVerificationResult, IntegrityVerifier};
use crate::config::LedgerConfig;
use clap::Args;
use uuid::Uuid;

/// Arguments for the verify subcommand
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Tenant whose chain is checked
    #[arg(long)]
    pub tenant: Uuid,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the verify command
///
/// Returns the verification result so the caller can pick the exit status.
pub async fn execute(
    args: &VerifyArgs,
    config: &LedgerConfig,
) -> Result<ChainVerificationResult, anyhow::Error> {
    let storage = super::open_storage(config).await?;
    let result = IntegrityVerifier::new(storage.clone())
        .verify(args.tenant)
        .await;
    storage.pool().close().await;
    let result = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result);
        for violation in &result.violations {
            println!(
                "  seq {}\t{}\t{:?}",
                violation.sequence_number, violation.entry_id, violation.kind
            );
        }
    }
    Ok(result)
}
