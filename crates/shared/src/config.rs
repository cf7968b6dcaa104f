//! Configuration management for the tracker.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Database settings
    pub database: DatabaseConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// External catalog settings
    #[serde(default)]
    pub catalogs: CatalogsConfig,

    /// Search cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path (relative to data directory or absolute)
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Worker threads (0 = one per core)
    pub workers: usize,

    /// Hours a login session stays valid
    pub session_ttl_hours: u64,

    /// Only send the session cookie over HTTPS
    pub secure_cookies: bool,
}

/// External catalog endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogsConfig {
    /// AniList GraphQL endpoint
    pub anilist_url: String,

    /// MangaDex REST API base URL
    pub mangadex_url: String,

    /// MangaDex cover image host
    pub mangadex_uploads_url: String,

    /// OpenLibrary base URL
    pub openlibrary_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// User agent sent to every catalog
    pub user_agent: String,
}

/// Search cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached searches
    pub capacity: usize,

    /// Entry lifetime in seconds
    pub ttl_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            workers: 0,
            session_ttl_hours: 24 * 14,
            secure_cookies: false,
        }
    }
}

impl Default for CatalogsConfig {
    fn default() -> Self {
        Self {
            anilist_url: "https://graphql.anilist.co".to_string(),
            mangadex_url: "https://api.mangadex.org".to_string(),
            mangadex_uploads_url: "https://uploads.mangadex.org".to_string(),
            openlibrary_url: "https://openlibrary.org".to_string(),
            timeout_seconds: 15,
            user_agent: "maaboo/0.1.0".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl_seconds: 3600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            database: DatabaseConfig {
                path: "tracker.db".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            server: ServerConfig::default(),
            catalogs: CatalogsConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the absolute path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the database file
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database.path)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.log_dir)
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }

    /// How long a login session stays valid
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.server.session_ttl_hours * 3600)
    }

    fn resolve(&self, configured: &str) -> PathBuf {
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}
