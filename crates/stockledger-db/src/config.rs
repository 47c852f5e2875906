//! # Stock Ledger Configuration
//!
//! Configuration for the database and label rendering.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKLEDGER_DB_PATH=/srv/stock.db                                  │
//! │     STOCKLEDGER_DB_MAX_CONNECTIONS=8                                   │
//! │     STOCKLEDGER_QR_EC_LEVEL=m                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockledger/config.toml (Linux)                          │
//! │     ~/Library/Application Support/org.stockledger.stockledger/ (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "stockledger.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//!
//! [labels]
//! error_correction = "l"  # l | m | q | h
//! module_size = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use stockledger_labels::LabelConfig;

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

/// The `[database]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Pool acquire timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("stockledger.db")
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl From<&DatabaseSettings> for DbConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        DbConfig::new(settings.path.clone())
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Stock Ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub labels: LabelConfig,
}

impl StockConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (config.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::ConfigLoadFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        let db = &self.database;

        if db.path.as_os_str().is_empty() {
            return Err(DbError::InvalidConfig("database.path must not be empty".into()));
        }

        if db.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if db.min_connections > db.max_connections {
            return Err(DbError::InvalidConfig(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                db.min_connections, db.max_connections
            )));
        }

        if self.labels.module_size == 0 {
            return Err(DbError::InvalidConfig(
                "labels.module_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("STOCKLEDGER_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("STOCKLEDGER_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric STOCKLEDGER_DB_MAX_CONNECTIONS"),
            }
        }

        if let Ok(level) = std::env::var("STOCKLEDGER_QR_EC_LEVEL") {
            match level.parse() {
                Ok(parsed) => {
                    debug!(level = %level, "Overriding QR error correction from environment");
                    self.labels.error_correction = parsed;
                }
                Err(_) => warn!(level = %level, "Unknown QR error correction level in environment"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "stockledger", "stockledger")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Pool configuration derived from `[database]`.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::from(&self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_labels::QrErrorCorrection;

    #[test]
    fn test_default_config() {
        let config = StockConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.labels.module_size, 10);
        assert_eq!(config.labels.error_correction, QrErrorCorrection::L);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StockConfig::default();

        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 2;
        config.database.min_connections = 3;
        assert!(config.validate().is_err());

        config.database.min_connections = 1;
        config.labels.module_size = 0;
        assert!(config.validate().is_err());

        config.labels.module_size = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: StockConfig = toml::from_str(
            r#"
            [database]
            path = "/var/lib/stock.db"

            [labels]
            error_correction = "h"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/var/lib/stock.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.labels.error_correction, QrErrorCorrection::H);
        assert_eq!(config.labels.module_size, 10);
    }

    #[test]
    fn test_save_then_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = StockConfig::default();
        config.database.path = dir.path().join("stock.db");
        config.labels.module_size = 6;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[database]"));
        assert!(contents.contains("[labels]"));

        let back: StockConfig = toml::from_str(&contents).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_db_config_from_settings() {
        let settings = DatabaseSettings {
            path: PathBuf::from("/tmp/x.db"),
            max_connections: 7,
            min_connections: 2,
            connect_timeout_secs: 3,
        };
        let db = DbConfig::from(&settings);
        assert_eq!(db.max_connections, 7);
        assert_eq!(db.min_connections, 2);
        assert_eq!(db.connect_timeout, Duration::from_secs(3));
    }
}
