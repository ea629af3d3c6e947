//! Sync status command handlers
//!
//! These only move the local status flag. Pushing to a remote store is done
//! by the embedding application through `Reconciler::push_pending`.

use anyhow::Result;

use quire_core::DocumentService;

use crate::output::Output;

/// List IDs of documents waiting to be pushed
pub fn pending(service: &DocumentService, output: &Output) -> Result<()> {
    let ids = service.get_pending_sync()?;
    output.print_ids(&ids, "Nothing pending.")
}

/// Mark a document as synced
pub fn mark_synced(service: &DocumentService, id: &str, output: &Output) -> Result<()> {
    if service.store().get_document(id)?.is_none() {
        output.message(&format!("No document {}; nothing to mark.", id));
        return Ok(());
    }

    service.mark_as_synced(id)?;
    output.success(&format!("Marked {} as synced", id));
    Ok(())
}

/// Flag a document as conflicted
pub fn mark_conflict(service: &DocumentService, id: &str, output: &Output) -> Result<()> {
    if service.store().get_document(id)?.is_none() {
        anyhow::bail!("Document not found: {}", id);
    }

    service.mark_as_conflict(id)?;
    output.success(&format!("Marked {} as conflicted", id));
    Ok(())
}

/// List conflicted documents
pub fn conflicts(service: &DocumentService, output: &Output) -> Result<()> {
    let records = service.get_conflicts()?;
    output.print_records(&records)
}
