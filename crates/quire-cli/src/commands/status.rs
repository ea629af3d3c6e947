//! Status command handler

use anyhow::Result;

use quire_core::{Config, DocumentService, SyncStatus};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(service: &DocumentService, config: &Config, output: &Output) -> Result<()> {
    let store = service.store();
    let total = store.document_count()?;
    let pending = store.count_by_status(SyncStatus::Pending)?;
    let synced = store.count_by_status(SyncStatus::Synced)?;
    let conflict = store.count_by_status(SyncStatus::Conflict)?;
    let drafts = store.all_drafts()?.len();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database": config.sqlite_path(),
                    "user_id": config.default_user_id,
                    "counts": {
                        "documents": total,
                        "pending": pending,
                        "synced": synced,
                        "conflict": conflict,
                        "drafts": drafts
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", pending);
        }
        OutputFormat::Human => {
            println!("Quire Status");
            println!("============");
            println!();
            println!("Storage:");
            println!("  Database: {}", config.sqlite_path().display());
            println!("  User:     {}", config.default_user_id);
            println!();
            println!("Documents: {}", total);
            println!("  Pending:  {}", pending);
            println!("  Synced:   {}", synced);
            println!("  Conflict: {}", conflict);
            println!("Drafts:    {}", drafts);
        }
    }

    Ok(())
}
