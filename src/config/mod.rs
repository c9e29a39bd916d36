//! Configuration management for the ledger.
//!
//! Settings come from defaults overridden by `LEDGER_*` environment variables
//! and are checked by [`Config::validate`] before use.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    pub storage: StorageConfig,
    /// Ledger behaviour
    pub ledger: LedgerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database directory
    pub db_path: PathBuf,
    /// Page cache size in MB
    pub cache_capacity_mb: usize,
    /// Flush to disk after every committed transaction
    pub flush_on_commit: bool,
}

/// How the ledger treats a block whose parent is stored but is not a tip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForkPolicy {
    /// Only tips may be extended; anything else is an orphan
    #[default]
    ExtendTips,
    /// A valid child of any stored block starts a new branch
    RetainForks,
}

impl FromStr for ForkPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "extend-tips" => Ok(ForkPolicy::ExtendTips),
            "retain-forks" => Ok(ForkPolicy::RetainForks),
            _ => Err(ConfigError::InvalidConfig {
                field: format!("ledger.fork_policy: {}", s),
            }),
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub fork_policy: ForkPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("forkledger.db"),
            cache_capacity_mb: 64,
            flush_on_commit: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(value: &str, field: &str) -> std::result::Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidConfig {
        field: field.to_string(),
    })
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Storage configuration
        if let Ok(db_path) = env::var("LEDGER_DB_PATH") {
            config.storage.db_path = PathBuf::from(db_path);
        }
        if let Ok(cache) = env::var("LEDGER_CACHE_CAPACITY_MB") {
            config.storage.cache_capacity_mb = parse_var(&cache, "cache_capacity_mb")?;
        }
        if let Ok(flush) = env::var("LEDGER_FLUSH_ON_COMMIT") {
            config.storage.flush_on_commit = parse_var(&flush, "flush_on_commit")?;
        }

        // Ledger configuration
        if let Ok(policy) = env::var("LEDGER_FORK_POLICY") {
            config.ledger.fork_policy = policy.parse()?;
        }

        // Logging configuration
        if let Ok(level) = env::var("LEDGER_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = env::var("LEDGER_LOG_FORMAT") {
            config.logging.format = format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.cache_capacity_mb == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "storage.cache_capacity_mb".to_string(),
                value: "0".to_string(),
                range: "1+".to_string(),
            }
            .into());
        }

        crate::storage::cache_capacity_bytes(self.storage.cache_capacity_mb)?;

        if self.storage.db_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig {
                field: "storage.db_path".to_string(),
            }
            .into());
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::InvalidConfig {
                    field: format!("logging.level: {}", self.logging.level),
                }
                .into());
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "pretty" | "json" => {}
            _ => {
                return Err(ConfigError::InvalidConfig {
                    field: format!("logging.format: {}", self.logging.format),
                }
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.db_path, PathBuf::from("forkledger.db"));
        assert_eq!(config.storage.cache_capacity_mb, 64);
        assert!(config.storage.flush_on_commit);
        assert_eq!(config.ledger.fork_policy, ForkPolicy::ExtendTips);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.storage.cache_capacity_mb = 0;
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_cache_fails_validation() {
        let mut config = Config::default();
        config.storage.cache_capacity_mb = usize::MAX;
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_fork_policy_parse() {
        assert_eq!("extend-tips".parse::<ForkPolicy>().unwrap(), ForkPolicy::ExtendTips);
        assert_eq!("Retain-Forks".parse::<ForkPolicy>().unwrap(), ForkPolicy::RetainForks);
        assert!("sometimes".parse::<ForkPolicy>().is_err());
    }

    #[test]
    fn test_env_override() {
        env::set_var("LEDGER_FORK_POLICY", "retain-forks");
        env::set_var("LEDGER_CACHE_CAPACITY_MB", "8");
        let config = Config::from_env().unwrap();
        env::remove_var("LEDGER_FORK_POLICY");
        env::remove_var("LEDGER_CACHE_CAPACITY_MB");

        assert_eq!(config.ledger.fork_policy, ForkPolicy::RetainForks);
        assert_eq!(config.storage.cache_capacity_mb, 8);
    }
}
