//! Configuration types for nzb-search
//!
//! The configuration is stored as TOML. Every field has a default, so a partial file is
//! valid and a missing file can be replaced by [`Config::default`] written to disk.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// NNTP server configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (typically 119 for unencrypted, 563 for TLS)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Use TLS (implicit TLS, not STARTTLS)
    #[serde(default)]
    pub tls: bool,

    /// Username for authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Maximum number of simultaneous connections (default: 50)
    #[serde(default = "default_connections")]
    pub connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: false,
            username: None,
            password: None,
            connections: default_connections(),
        }
    }
}

impl ServerConfig {
    /// True if credentials are configured and AUTHINFO should be sent
    pub fn has_credentials(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Search behavior configuration
///
/// Flattened into [`Config`], so these keys live at the top level of the TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Groups to scan: comma list, path to a file with one group per line,
    /// `ALL` or `BINARIES`. Prompted for when unset.
    #[serde(default)]
    pub groups: Option<String>,

    /// Directory the NZB files are written to (default: ".")
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Days to search back from the post date. Prompted for when unset.
    #[serde(default)]
    pub days: Option<u32>,

    /// Number of groups scanned in parallel (default: 200)
    #[serde(default = "default_parallel_scans")]
    pub parallel_scans: usize,

    /// Number of overview records requested per chunk (default: 20000)
    ///
    /// `step` × `parallel_scans` bounds how many overview records are held in memory.
    #[serde(default = "default_step")]
    pub step: u64,

    /// Log verbose diagnostics (parse rejections, bracket positions)
    #[serde(default)]
    pub verbose: bool,

    /// Sort each file's segments by segment number before writing the NZB (default: true)
    #[serde(default = "default_true")]
    pub sort_segments: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            groups: None,
            path: default_path(),
            days: None,
            parallel_scans: default_parallel_scans(),
            step: default_step(),
            verbose: false,
            sort_segments: true,
        }
    }
}

/// Deadlines applied to network operations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Dial plus authentication deadline in seconds (default: 60)
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,

    /// Deadline for a single NNTP command in seconds (default: 300)
    #[serde(default = "default_command_secs")]
    pub command_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            command_secs: default_command_secs(),
        }
    }
}

impl TimeoutConfig {
    /// Connect deadline
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    /// Per-command deadline
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Usenet server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Search settings
    #[serde(flatten)]
    pub search: SearchConfig,

    /// Network deadlines
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config {
            message: format!("invalid configuration file: {}", e),
            key: None,
        })
    }

    /// Write this configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| Error::Config {
            message: format!("failed to serialize configuration: {}", e),
            key: None,
        })?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Check settings that must hold before any scanning starts
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config("server.host", "server host must not be empty"));
        }
        if self.server.connections == 0 {
            return Err(Error::config(
                "server.connections",
                "at least one connection is required",
            ));
        }
        if self.search.parallel_scans == 0 {
            return Err(Error::config(
                "parallel_scans",
                "at least one group must be scanned at a time",
            ));
        }
        if self.search.step == 0 {
            return Err(Error::config("step", "step must be at least 1"));
        }
        if !self.search.path.is_dir() {
            return Err(Error::config(
                "path",
                format!(
                    "output path '{}' does not exist or is not a directory",
                    self.search.path.display()
                ),
            ));
        }
        Ok(())
    }
}

// Conversion from our ServerConfig to nntp-rs's ServerConfig
impl From<ServerConfig> for nntp_rs::ServerConfig {
    fn from(config: ServerConfig) -> Self {
        nntp_rs::ServerConfig {
            host: config.host,
            port: config.port,
            tls: config.tls,
            allow_insecure_tls: false,
            username: config.username.unwrap_or_default(),
            password: config.password.unwrap_or_default(),
        }
    }
}

fn default_host() -> String {
    "news.example.com".to_string()
}

fn default_port() -> u16 {
    119
}

fn default_connections() -> usize {
    50
}

fn default_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_parallel_scans() -> usize {
    200
}

fn default_step() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

fn default_connect_secs() -> u64 {
    60
}

fn default_command_secs() -> u64 {
    300
}
