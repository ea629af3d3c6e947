//! Quire CLI
//!
//! Command-line interface for Quire - an encrypted local-first document store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quire_core::{Config, DocumentService, LocalStore};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Quire - Encrypted local-first document store")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Secret used to encrypt and decrypt content
    #[arg(long, global = true, env = "QUIRE_SECRET", hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt and save a document
    Save {
        /// Content to save (read from stdin if omitted)
        content: Option<String>,
        /// Document ID (a new one is generated if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Document title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
        /// Owner (defaults to the configured user)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Show a decrypted document
    Get {
        /// Document ID
        id: String,
    },
    /// Show or write the draft of a document
    Draft {
        /// Document ID
        id: String,
        /// New draft content (shows the current draft if omitted)
        content: Option<String>,
    },
    /// Delete a document with its draft and AI context
    #[command(alias = "rm")]
    Delete {
        /// Document ID
        id: String,
    },
    /// List stored documents (content stays encrypted)
    #[command(alias = "ls")]
    List {
        /// Owner (defaults to the configured user)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List IDs of documents waiting to be pushed
    Pending,
    /// Record that a document reached the remote store
    MarkSynced {
        /// Document ID
        id: String,
    },
    /// Flag a document as conflicted
    Conflict {
        /// Document ID
        id: String,
    },
    /// List conflicted documents
    Conflicts,
    /// Export all local data as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
    /// Remove all local data
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show store status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_level, default_user_id)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.log_level);

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(&config, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(config, key, value, &output)
            }
        };
    }

    tracing::debug!(path = %config.sqlite_path().display(), "Opening local store");
    let store = LocalStore::open(&config).context("Failed to open local store")?;
    let mut service = DocumentService::new(store);
    let secret = cli.secret.as_deref();

    let result = match cli.command {
        Commands::Save {
            content,
            id,
            title,
            tag,
            user,
        } => {
            let user = user.unwrap_or_else(|| config.default_user_id.clone());
            let args = commands::document::SaveArgs {
                id,
                title,
                tags: tag,
                user,
                content,
            };
            commands::document::save(&service, args, require_secret(secret)?, &output)
        }
        Commands::Get { id } => {
            commands::document::get(&service, &id, require_secret(secret)?, &output)
        }
        Commands::Draft { id, content } => {
            commands::document::draft(&service, &id, content, require_secret(secret)?, &output)
        }
        Commands::Delete { id } => commands::document::delete(&service, &id, &output),
        Commands::List { user } => {
            let user = user.unwrap_or_else(|| config.default_user_id.clone());
            commands::document::list(&service, &user, &output)
        }
        Commands::Pending => commands::sync::pending(&service, &output),
        Commands::MarkSynced { id } => commands::sync::mark_synced(&service, &id, &output),
        Commands::Conflict { id } => commands::sync::mark_conflict(&service, &id, &output),
        Commands::Conflicts => commands::sync::conflicts(&service, &output),
        Commands::Export { output: path } => {
            commands::data::export(&mut service, path.as_deref(), &output)
        }
        Commands::Clear { yes } => commands::data::clear(&mut service, yes, &output),
        Commands::Status => commands::status::show(&service, &config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    finish(result, service.close())
}

/// Combine the command outcome with closing the store
///
/// A command error wins; a close failure behind it is only logged.
fn finish(result: Result<()>, closed: quire_core::Result<()>) -> Result<()> {
    match (result, closed) {
        (Err(e), Err(close_err)) => {
            tracing::warn!(error = %close_err, "Failed to close local store");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => closed.context("Failed to close local store"),
    }
}

/// Install the stderr subscriber
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("quire_core={},quire_cli={}", log_level, log_level))
    });

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn require_secret(secret: Option<&str>) -> Result<&str> {
    match secret {
        Some(s) if !s.is_empty() => Ok(s),
        _ => anyhow::bail!("A secret is required. Pass --secret or set QUIRE_SECRET."),
    }
}
