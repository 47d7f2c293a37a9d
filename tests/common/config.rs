//! Test configuration helpers for loading .env credentials and building test engines

use chrono::NaiveDate;
use std::path::Path;
use tempfile::TempDir;
use nzb_search::{Config, ConnectionPool, SearchEngine, SearchRequest, ServerConfig};

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Load NNTP server configuration from environment variables
///
/// Required environment variables:
/// - `NNTP_HOST` - Server hostname
/// - `NNTP_USERNAME` - Authentication username
/// - `NNTP_PASSWORD` - Authentication password
///
/// Optional environment variables:
/// - `NNTP_PORT_SSL` - TLS port (default: 563)
/// - `NNTP_CONNECTIONS` - Number of connections (default: 4)
pub fn load_server_config() -> Result<ServerConfig, ConfigError> {
    dotenvy::dotenv().ok();

    let host = std::env::var("NNTP_HOST")
        .map_err(|_| ConfigError("NNTP_HOST not set in environment".to_string()))?;

    let port: u16 = std::env::var("NNTP_PORT_SSL")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(563);

    let username = std::env::var("NNTP_USERNAME")
        .map_err(|_| ConfigError("NNTP_USERNAME not set in environment".to_string()))?;

    let password = std::env::var("NNTP_PASSWORD")
        .map_err(|_| ConfigError("NNTP_PASSWORD not set in environment".to_string()))?;

    let connections: usize = std::env::var("NNTP_CONNECTIONS")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(4);

    Ok(ServerConfig {
        host,
        port,
        tls: true,
        username: Some(username),
        password: Some(password),
        connections,
    })
}

/// Check if live credentials are available
pub fn has_live_credentials() -> bool {
    load_server_config().is_ok()
}

/// Search group for live tests (`NNTP_TEST_GROUP`, default: alt.binaries.test)
pub fn live_test_group() -> String {
    dotenvy::dotenv().ok();
    std::env::var("NNTP_TEST_GROUP").unwrap_or_else(|_| "alt.binaries.test".to_string())
}

/// Configuration writing NZB files into `output`
pub fn test_config(server: ServerConfig, output: &Path) -> Config {
    let mut config = Config::default();
    config.server = server;
    config.search.path = output.to_path_buf();
    config.search.step = 25;
    config.search.parallel_scans = 2;
    config
}

/// Create a live search engine writing into a fresh temp directory
///
/// Returns the engine, its pool and the temp directory (keep it alive for the test duration)
pub fn create_live_engine(
    term: &str,
    post_date: NaiveDate,
    days: u32,
) -> Result<(SearchEngine, ConnectionPool, TempDir), ConfigError> {
    let server = load_server_config()?;
    let temp_dir =
        TempDir::new().map_err(|e| ConfigError(format!("Failed to create temp dir: {}", e)))?;

    let mut config = test_config(server, temp_dir.path());
    config.search.step = 10_000;
    let pool = ConnectionPool::from_config(&config);
    let request = SearchRequest {
        term: term.to_string(),
        post_date,
        days,
    };
    let engine = SearchEngine::new(&config, pool.clone(), request)
        .map_err(|e| ConfigError(format!("Failed to create engine: {}", e)))?;
    Ok((engine, pool, temp_dir))
}
