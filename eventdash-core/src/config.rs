//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/eventdash/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/eventdash/` (~/.config/eventdash/)
//! - Data: `$XDG_DATA_HOME/eventdash/` (~/.local/share/eventdash/)
//! - State/Logs: `$XDG_STATE_HOME/eventdash/` (~/.local/state/eventdash/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Where rows come from
    #[serde(default)]
    pub store: StoreConfig,

    /// Virtual canvas for chart geometry
    #[serde(default)]
    pub chart: ChartConfig,

    /// CSV export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Supported row store backends
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local SQLite document store
    #[default]
    Sqlite,
    /// PostgREST-compatible HTTP endpoint
    Remote,
}

/// Row store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Override for the SQLite file (defaults to the XDG data dir)
    pub database_path: Option<PathBuf>,

    /// Base URL of the remote project (e.g., `https://xyz.supabase.co`)
    pub url: Option<String>,

    /// Anon or service key for the remote project (can also use env var)
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_path: None,
            url: None,
            api_key: None,
            timeout_secs: default_store_timeout(),
        }
    }
}

fn default_store_timeout() -> u64 {
    30
}

impl StoreConfig {
    /// Environment variable consulted when `api_key` is not set.
    pub const API_KEY_ENV: &'static str = "EVENTDASH_API_KEY";

    /// Resolve the API key from config or environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(Self::API_KEY_ENV).ok())
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.backend != StoreBackend::Remote {
            return Ok(());
        }

        if self.url.is_none() {
            return Err(Error::Config(
                "store.url is required for the remote backend".to_string(),
            ));
        }
        if self.resolved_api_key().is_none() {
            return Err(Error::Config(format!(
                "store.api_key (or {}) is required for the remote backend",
                Self::API_KEY_ENV
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "store.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// SQLite file to use for the local backend
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(Config::database_path)
    }
}

/// Chart canvas configuration
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ChartConfig {
    #[serde(default = "default_chart_width")]
    pub width: f64,
    #[serde(default = "default_chart_height")]
    pub height: f64,
    #[serde(default = "default_chart_padding")]
    pub padding: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_chart_width(),
            height: default_chart_height(),
            padding: default_chart_padding(),
        }
    }
}

fn default_chart_width() -> f64 {
    600.0
}

fn default_chart_height() -> f64 {
    200.0
}

fn default_chart_padding() -> f64 {
    16.0
}

/// CSV export configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExportConfig {
    /// Directory for exported files (defaults to `<data dir>/exports`)
    pub dir: Option<PathBuf>,
}

impl ExportConfig {
    pub fn export_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("exports"))
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.store.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/eventdash/config.toml` (~/.config/eventdash/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("eventdash").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database and exports)
    ///
    /// `$XDG_DATA_HOME/eventdash/` (~/.local/share/eventdash/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("eventdash")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/eventdash/` (~/.local/state/eventdash/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("eventdash")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/eventdash/data.db` (~/.local/share/eventdash/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.chart.width, 600.0);
        assert_eq!(config.chart.height, 200.0);
        assert_eq!(config.chart.padding, 16.0);
        assert_eq!(config.logging.level, "info");
        assert!(config.store.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[store]
backend = "remote"
url = "https://project.example.co"
api_key = "anon-key"

[chart]
width = 800

[export]
dir = "/tmp/exports"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.store.backend, StoreBackend::Remote);
        assert_eq!(config.store.url.as_deref(), Some("https://project.example.co"));
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.chart.width, 800.0);
        assert_eq!(config.chart.padding, 16.0);
        assert_eq!(config.export.export_dir(), PathBuf::from("/tmp/exports"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.store.validate().is_ok());
    }

    #[test]
    fn test_remote_store_validation() {
        let config = StoreConfig {
            backend: StoreBackend::Remote,
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            backend: StoreBackend::Remote,
            url: Some("https://project.example.co".to_string()),
            api_key: Some("key".to_string()),
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\ndatabase_path = \"/tmp/ed.db\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.store.database_path(), PathBuf::from("/tmp/ed.db"));

        std::fs::write(&path, "[store\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
