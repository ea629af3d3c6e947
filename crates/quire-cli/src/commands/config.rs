//! Config command handlers

use anyhow::{bail, Context, Result};

use quire_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config: &Config, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "log_level": config.log_level,
                    "default_user_id": config.default_user_id
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:        {}", config.data_dir.display());
            println!("  log_level:       {}", config.log_level);
            println!("  default_user_id: {}", config.default_user_id);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value and save it
pub fn set(mut config: Config, key: String, value: String, output: &Output) -> Result<()> {
    apply(&mut config, &key, &value)?;
    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "log_level" => {
            let level = value.to_lowercase();
            if !["error", "warn", "info", "debug", "trace"].contains(&level.as_str()) {
                bail!("Invalid log_level '{}'. Use error, warn, info, debug, or trace.", value);
            }
            config.log_level = level;
        }
        "default_user_id" => {
            if value.is_empty() {
                bail!("default_user_id cannot be empty");
            }
            config.default_user_id = value.to_string();
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, log_level, default_user_id",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();
        apply(&mut config, "log_level", "DEBUG").unwrap();
        apply(&mut config, "default_user_id", "alice").unwrap();
        apply(&mut config, "data_dir", "/tmp/quire").unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.default_user_id, "alice");
        assert_eq!(config.data_dir, std::path::PathBuf::from("/tmp/quire"));
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();
        assert!(apply(&mut config, "log_level", "loud").is_err());
        assert!(apply(&mut config, "default_user_id", "").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());
    }
}
