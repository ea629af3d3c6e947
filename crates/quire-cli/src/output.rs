//! Output formatting for CLI
//!
//! Every command prints through [`Output`] so `--json` and `--quiet` behave
//! the same everywhere. Quiet mode prints ids (or nothing) for scripting.

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use quire_core::{Document, DocumentRecord, Draft};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a decrypted document
    pub fn print_document(&self, doc: &Document) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", doc.id);
                println!("Title:    {}", doc.title);
                println!("Owner:    {}", doc.user_id);
                println!("Version:  {}", doc.metadata.version);
                println!("Words:    {}", doc.metadata.word_count);
                println!("Status:   {}", doc.sync_status);
                if !doc.metadata.tags.is_empty() {
                    let tags: Vec<&str> = doc.metadata.tags.iter().map(String::as_str).collect();
                    println!("Tags:     {}", tags.join(", "));
                }
                println!(
                    "Modified: {}",
                    doc.metadata.last_modified.format("%Y-%m-%d %H:%M")
                );
                println!();
                println!("{}", doc.content);
            }
            OutputFormat::Json => {
                print_json(&json!({
                    "id": doc.id,
                    "userId": doc.user_id,
                    "title": doc.title,
                    "content": doc.content,
                    "metadata": doc.metadata,
                    "syncStatus": doc.sync_status,
                }))?;
            }
            OutputFormat::Quiet => {
                println!("{}", doc.id);
            }
        }
        Ok(())
    }

    /// Print a list of stored records without decrypting them
    pub fn print_records(&self, records: &[DocumentRecord]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No documents found.");
                    return Ok(());
                }
                for record in records {
                    println!(
                        "{} | {} | v{} | {}",
                        truncate(&record.id, 36),
                        truncate(&record.title, 35),
                        record.metadata.version,
                        record.sync_status
                    );
                }
                println!("\n{} document(s)", records.len());
            }
            OutputFormat::Json => print_json(records)?,
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id);
                }
            }
        }
        Ok(())
    }

    /// Print a list of document IDs
    pub fn print_ids(&self, ids: &[String], empty_message: &str) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if ids.is_empty() {
                    println!("{}", empty_message);
                    return Ok(());
                }
                for id in ids {
                    println!("{}", id);
                }
                println!("\n{} document(s)", ids.len());
            }
            OutputFormat::Json => print_json(ids)?,
            OutputFormat::Quiet => {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
        Ok(())
    }

    /// Print a decrypted draft
    pub fn print_draft(&self, draft: &Draft) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "Draft of {} ({})",
                    draft.document_id,
                    draft.timestamp.format("%Y-%m-%d %H:%M")
                );
                println!();
                println!("{}", draft.content);
            }
            OutputFormat::Json => {
                print_json(&json!({
                    "documentId": draft.document_id,
                    "content": draft.content,
                    "timestamp": draft.timestamp,
                }))?;
            }
            OutputFormat::Quiet => {
                println!("{}", draft.content);
            }
        }
        Ok(())
    }

    /// Report a completed action
    pub fn success(&self, message: &str) {
        self.notice("✓ ", json!({"status": "success", "message": message}), message);
    }

    /// Report something that is neither a result nor an error
    pub fn message(&self, msg: &str) {
        self.notice("", json!({"message": msg}), msg);
    }

    /// Interactive prompts only make sense for human output
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    // Quiet mode drops notices entirely
    fn notice(&self, prefix: &str, as_json: serde_json::Value, text: &str) {
        match self.format {
            OutputFormat::Human => println!("{}{}", prefix, text),
            OutputFormat::Json => println!("{}", as_json),
            OutputFormat::Quiet => {}
        }
    }
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        let cases = [
            ((false, false), OutputFormat::Human),
            ((true, false), OutputFormat::Json),
            ((false, true), OutputFormat::Quiet),
            // --quiet beats --json
            ((true, true), OutputFormat::Quiet),
        ];
        for ((json, quiet), expected) in cases {
            assert_eq!(OutputFormat::from_flags(json, quiet), expected);
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_should_prompt() {
        assert!(Output::new(OutputFormat::Human).should_prompt());
        assert!(!Output::new(OutputFormat::Json).should_prompt());
        assert!(Output::new(OutputFormat::Quiet).is_quiet());
    }
}
