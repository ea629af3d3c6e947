//! Export and clear command handlers

use std::io::{self, IsTerminal, Write};
use std::path::Path;

use anyhow::{Context, Result};

use quire_core::{DocumentService, Reconciler};

use crate::output::{print_json, Output};

/// Export every local table as JSON
pub fn export(service: &mut DocumentService, path: Option<&Path>, output: &Output) -> Result<()> {
    let snapshot = Reconciler::new(service).export_local_data()?;

    match path {
        Some(path) => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write export file: {:?}", path))?;
            output.success(&format!(
                "Exported {} document(s), {} draft(s), {} AI context(s) to {}",
                snapshot.documents.len(),
                snapshot.drafts.len(),
                snapshot.ai_context.len(),
                path.display()
            ));
        }
        None => print_json(&snapshot)?,
    }

    Ok(())
}

/// Remove all local data
///
/// Asks first unless `--yes` is given. Non-interactive callers must pass it.
pub fn clear(service: &mut DocumentService, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        let confirmed = output.should_prompt()
            && confirm("Remove all local documents, drafts, and AI context?")?;
        if !confirmed {
            output.message("Aborted. Pass --yes to clear without prompting.");
            return Ok(());
        }
    }

    let outstanding = {
        let mut reconciler = Reconciler::new(service);
        let outstanding = reconciler.outstanding()?;
        reconciler.clear_local_data()?;
        outstanding
    };

    if !outstanding.is_empty() && !output.is_quiet() {
        eprintln!(
            "⚠ Cleared {} document(s) that had not been synced",
            outstanding.len()
        );
    }
    output.success("Cleared local data");
    Ok(())
}

/// Prompt for confirmation
///
/// Returns false when stdin is not a terminal.
fn confirm(prompt: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
