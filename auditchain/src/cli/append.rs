//! append subcommand
//!
//! Writes a single entry through the serialized writer and prints the receipt.

use crate::audit::{types::NewAuditEntry, writer::AuditWriter};
use crate::config::LedgerConfig;
use clap::Args;
use serde_json::Value;
use uuid::Uuid;

/// Arguments for the append subcommand
#[derive(Args, Debug, Clone)]
pub struct AppendArgs {
    /// Tenant that owns the chain
    #[arg(long)]
    pub tenant: Uuid,

    /// Action name (e.g. part.created)
    #[arg(long)]
    pub action: String,

    /// Kind of entity affected
    #[arg(long)]
    pub entity_type: String,

    /// Identifier of the affected entity
    #[arg(long)]
    pub entity_id: Option<String>,

    /// Acting user
    #[arg(long)]
    pub user_id: Option<String>,

    /// Free-form JSON metadata
    #[arg(long, value_parser = parse_json_object)]
    pub metadata: Option<Value>,
}

impl AppendArgs {
    /// Build the write request described by these arguments.
    pub fn to_entry(&self) -> NewAuditEntry {
        let mut entry = NewAuditEntry::new(self.tenant, &self.action, &self.entity_type);
        if let Some(entity_id) = &self.entity_id {
            entry = entry.entity_id(entity_id);
        }
        if let Some(user_id) = &self.user_id {
            entry = entry.user_id(user_id);
        }
        if let Some(metadata) = &self.metadata {
            entry = entry.metadata(metadata.clone());
        }
        entry
    }
}

fn parse_json_object(raw: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err("metadata must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

/// Execute the append command
pub async fn execute(args: &AppendArgs, config: &LedgerConfig) -> Result<(), anyhow::Error> {
    let storage = super::open_storage(config).await?;
    let writer = AuditWriter::new(storage.clone());
    let receipt = writer.write(args.to_entry()).await;
    storage.pool().close().await;

    println!("{}", serde_json::to_string_pretty(&receipt?)?);
    Ok(())
}
