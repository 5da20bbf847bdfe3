use crate::core::{LiteError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Journal modes SQLite accepts for `PRAGMA journal_mode`.
const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Whether the source named `[database] path` rather than inheriting the default
    #[serde(skip)]
    path_configured: bool,
}

impl Config {
    /// True when the parsed TOML set `[database] path` explicitly.
    pub fn path_configured(&self) -> bool {
        self.path_configured
    }
}

/// Settings applied when a `Database` handle opens its connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file, or `:memory:` for a private in-memory database
    pub path: PathBuf,
    /// Value for `PRAGMA foreign_keys`
    pub foreign_keys: bool,
    /// How long a statement waits on a locked database before failing
    pub busy_timeout_ms: u64,
    /// Value for `PRAGMA journal_mode`; the engine default when unset
    pub journal_mode: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from(":memory:"),
            foreign_keys: true,
            busy_timeout_ms: 5000,
            journal_mode: None,
        }
    }
}

impl DatabaseConfig {
    /// Default settings against the given database file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DatabaseConfig {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Checks values the engine would otherwise reject at open time.
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(LiteError::Config("database path must not be empty".to_string()));
        }
        if let Some(mode) = &self.journal_mode {
            if !JOURNAL_MODES.contains(&mode.to_uppercase().as_str()) {
                return Err(LiteError::Config(format!(
                    "unknown journal_mode '{}', expected one of {}",
                    mode,
                    JOURNAL_MODES.join(", ")
                )));
            }
        }
        Ok(())
    }
}

impl From<&str> for DatabaseConfig {
    fn from(path: &str) -> Self {
        DatabaseConfig::new(path)
    }
}

impl From<String> for DatabaseConfig {
    fn from(path: String) -> Self {
        DatabaseConfig::new(path)
    }
}

impl From<&Path> for DatabaseConfig {
    fn from(path: &Path) -> Self {
        DatabaseConfig::new(path)
    }
}

impl From<PathBuf> for DatabaseConfig {
    fn from(path: PathBuf) -> Self {
        DatabaseConfig::new(path)
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = litecrud::config::load_config("litecrud.toml").expect("Failed to load config");
/// println!("{:?}", config.database.path);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let value: toml::Value = content.parse().map_err(|e: toml::de::Error| LiteError::Config(e.to_string()))?;
    let path_configured = value
        .get("database")
        .and_then(|database| database.get("path"))
        .is_some();

    let mut config: Config = value.try_into().map_err(|e| LiteError::Config(e.to_string()))?;
    config.path_configured = path_configured;
    config.database.validate()?;
    Ok(config)
}

/// Per-user configuration file location, e.g. `~/.config/litecrud/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("litecrud").join("config.toml"))
}
