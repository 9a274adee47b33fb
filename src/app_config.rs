use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::database::DatabaseConnection;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Relational database file, `None` for the default data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Full-text index database file, `None` for the default data directory
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Queue index updates instead of writing them inline
    #[serde(default)]
    pub offload_indexing: bool,

    /// How many similar messages `similar` tries to collect
    #[serde(default = "default_similar_messages")]
    pub similar_messages: usize,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Cache configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// Disable to always recompute counts
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            default_ttl_secs: default_ttl_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_similar_messages() -> usize {
    5
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Write configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.similar_messages == 0 {
            return Err(anyhow!("similar_messages must be at least 1"));
        }

        if self.cache.default_ttl_secs == 0 {
            return Err(anyhow!("cache.default_ttl_secs must be at least 1"));
        }

        if let (Some(db), Some(index)) = (&self.database_path, &self.index_path) {
            if db == index {
                return Err(anyhow!(
                    "database_path and index_path must differ: {}",
                    db.display()
                ));
            }
        }

        Ok(())
    }

    /// Effective relational database path
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => DatabaseConnection::default_database_path(),
        }
    }

    /// Effective full-text index path
    pub fn resolved_index_path(&self) -> Result<PathBuf> {
        match &self.index_path {
            Some(path) => Ok(path.clone()),
            None => DatabaseConnection::default_index_path(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: None,
            index_path: None,
            offload_indexing: false,
            similar_messages: default_similar_messages(),
            cache: CacheConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
