//! Document command handlers

use std::io::Read;

use anyhow::{bail, Context, Result};

use quire_core::{Document, DocumentService};

use crate::output::Output;

/// Arguments for `quire save`
pub struct SaveArgs {
    pub id: Option<String>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub user: String,
    pub content: Option<String>,
}

/// Encrypt and save a document
///
/// Saving under an existing id keeps its title and tags unless overridden.
pub fn save(service: &DocumentService, args: SaveArgs, secret: &str, output: &Output) -> Result<()> {
    let content = match args.content {
        Some(c) => c,
        None => read_stdin().context("Failed to read content from stdin")?,
    };

    let existing = match &args.id {
        Some(id) => service
            .get_document(id, secret)
            .with_context(|| format!("Failed to load document {}", id))?,
        None => None,
    };

    let mut doc = match (existing, args.id) {
        (Some(doc), _) => doc,
        (None, Some(id)) => Document::with_id(id, args.user, ""),
        (None, None) => Document::new(args.user, ""),
    };

    if let Some(title) = args.title {
        doc.title = title;
    }
    if doc.title.is_empty() {
        bail!("A title is required for a new document. Pass --title.");
    }
    for tag in args.tags {
        doc.add_tag(tag);
    }
    doc.set_content(content);

    let saved = service
        .save_document(&doc, secret)
        .context("Failed to save document")?;

    output.success(&format!(
        "Saved {} (version {}, {})",
        saved.id,
        saved.version(),
        saved.sync_status
    ));

    Ok(())
}

/// Show a decrypted document
pub fn get(service: &DocumentService, id: &str, secret: &str, output: &Output) -> Result<()> {
    let doc = service
        .get_document(id, secret)?
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", id))?;

    output.print_document(&doc)
}

/// Show or replace the draft of a document
pub fn draft(
    service: &DocumentService,
    id: &str,
    content: Option<String>,
    secret: &str,
    output: &Output,
) -> Result<()> {
    match content {
        Some(content) => {
            service
                .save_draft(id, &content, secret)
                .context("Failed to save draft")?;
            output.success(&format!("Saved draft for {}", id));
            Ok(())
        }
        None => {
            let draft = service
                .get_draft(id, secret)?
                .ok_or_else(|| anyhow::anyhow!("No draft for document: {}", id))?;
            output.print_draft(&draft)
        }
    }
}

/// Delete a document
pub fn delete(service: &DocumentService, id: &str, output: &Output) -> Result<()> {
    if !service.delete_document(id)? {
        bail!("Document not found: {}", id);
    }

    output.success(&format!("Deleted document {}", id));
    Ok(())
}

/// List stored documents for an owner
pub fn list(service: &DocumentService, user: &str, output: &Output) -> Result<()> {
    let records = service.get_all_documents(user)?;
    output.print_records(&records)
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf.trim_end_matches('\n').to_string())
}
