//! Application configuration
//!
//! Values are layered, later layers winning:
//! 1. Built-in defaults
//! 2. The TOML file at `~/.config/quire/config.toml` (or `$QUIRE_CONFIG`)
//! 3. `QUIRE_DATA_DIR`, `QUIRE_LOG_LEVEL` and `QUIRE_USER_ID`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "QUIRE";

/// Owner id used for documents created before sign-in
pub const GUEST_USER_ID: &str = "guest";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `quire.db`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Level for the CLI subscriber (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Owner id used when the caller does not name one
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            default_user_id: default_user_id(),
        }
    }
}

impl Config {
    /// Load from the default file location, then apply the environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `path`, falling back to defaults when the file is absent
    ///
    /// The data directory is created if needed.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot read config file {}", path.display()))
            }
        };

        config.apply_env_overrides();
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Cannot create data directory {}", config.data_dir.display())
        })?;
        Ok(config)
    }

    /// Parse a TOML document and apply the environment, without touching disk
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(toml_content).context("Invalid config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(dir) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = env_var("LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
        if let Some(user) = env_var("USER_ID") {
            // An empty id means "back to guest"
            self.default_user_id = if user.is_empty() {
                default_user_id()
            } else {
                user
            };
        }
    }

    /// Write the configuration to [`Config::config_file_path`]
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Write the configuration to `path`, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create config directory {}", parent.display()))?;
        }

        let text = toml::to_string_pretty(self).context("Cannot serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("Cannot write config file {}", path.display()))
    }

    /// Location of the config file (`$QUIRE_CONFIG` wins)
    pub fn config_file_path() -> PathBuf {
        match env_var("CONFIG") {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("quire")
                .join("config.toml"),
        }
    }

    /// Location of the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("quire.db")
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quire")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_user_id() -> String {
    GUEST_USER_ID.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests that read or write QUIRE_* variables hold this lock
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "QUIRE_DATA_DIR",
        "QUIRE_LOG_LEVEL",
        "QUIRE_USER_ID",
        "QUIRE_CONFIG",
    ];

    /// Run `f` with the QUIRE_* variables set to `overrides` (all others
    /// unset), restoring the previous environment afterwards
    fn with_env<R>(overrides: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let saved: Vec<_> = VARS.iter().map(|v| (*v, env::var(v).ok())).collect();

        for var in VARS {
            env::remove_var(var);
        }
        for (var, value) in overrides {
            env::set_var(var, value);
        }

        let result = f();

        for (var, value) in saved {
            match value {
                Some(v) => env::set_var(var, v),
                None => env::remove_var(var),
            }
        }
        result
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.default_user_id, GUEST_USER_ID);
        assert!(config.data_dir.ends_with("quire"));
        assert!(config.sqlite_path().ends_with("quire.db"));
    }

    #[test]
    fn test_file_values_then_env_overrides() {
        let toml = r#"
            data_dir = "/srv/quire"
            log_level = "info"
            default_user_id = "bob"
        "#;

        let from_file = with_env(&[], || Config::load_from_str(toml).unwrap());
        assert_eq!(from_file.data_dir, PathBuf::from("/srv/quire"));
        assert_eq!(from_file.log_level, "info");
        assert_eq!(from_file.default_user_id, "bob");

        let overridden = with_env(
            &[
                ("QUIRE_DATA_DIR", "/tmp/quire-env"),
                ("QUIRE_LOG_LEVEL", "trace"),
                ("QUIRE_USER_ID", "alice"),
            ],
            || Config::load_from_str(toml).unwrap(),
        );
        assert_eq!(overridden.data_dir, PathBuf::from("/tmp/quire-env"));
        assert_eq!(overridden.log_level, "trace");
        assert_eq!(overridden.default_user_id, "alice");
    }

    #[test]
    fn test_empty_env_values() {
        let config = with_env(&[("QUIRE_LOG_LEVEL", ""), ("QUIRE_USER_ID", "")], || {
            Config::load_from_str("default_user_id = \"bob\"").unwrap()
        });

        // Empty level is ignored; empty user id resets to guest
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.default_user_id, GUEST_USER_ID);
    }

    #[test]
    fn test_missing_file_uses_defaults_and_creates_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        let data_dir_str = data_dir.to_string_lossy().into_owned();

        let config = with_env(&[("QUIRE_DATA_DIR", data_dir_str.as_str())], || {
            Config::load_from_path(&temp_dir.path().join("absent.toml")).unwrap()
        });

        assert_eq!(config.log_level, "warn");
        assert_eq!(config.data_dir, data_dir);
        assert!(data_dir.is_dir());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "log_level = [").unwrap();

        let result = with_env(&[], || Config::load_from_path(&path));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let config = Config {
            data_dir: temp_dir.path().join("data"),
            log_level: "debug".to_string(),
            default_user_id: "carol".to_string(),
        };

        config.save_to_path(&path).unwrap();
        let loaded = with_env(&[], || Config::load_from_path(&path).unwrap());

        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.default_user_id, "carol");
    }

    #[test]
    fn test_config_file_path_override() {
        let path = with_env(&[("QUIRE_CONFIG", "/etc/quire.toml")], Config::config_file_path);
        assert_eq!(path, PathBuf::from("/etc/quire.toml"));
    }
}
