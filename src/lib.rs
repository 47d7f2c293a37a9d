//! # nzb-search
//!
//! Find a release on Usenet by a piece of its subject and rebuild the NZB from overview data.
//!
//! ## How it works
//!
//! Given a search term, a posting date and a number of days, nzb-search:
//! - **Locates** the article numbers bracketing that time window in every group by binary
//!   searching overview dates
//! - **Scans** the range in chunks, in parallel, over a bounded pool of NNTP connections
//! - **Parses** every matching subject into release name, file name and yEnc counters
//! - **Aggregates** segments into files and files into releases
//! - **Writes** one NZB file per release found
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use nzb_search::{Config, ConnectionPool, GroupSource, SearchEngine, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.server.host = "news.example.com".to_string();
//!     config.server.connections = 20;
//!
//!     let pool = ConnectionPool::from_config(&config);
//!     let groups = GroupSource::parse("a.b.teevee").resolve(&pool).await?;
//!
//!     let request = SearchRequest {
//!         term: "My.Release".to_string(),
//!         post_date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap_or_default(),
//!         days: 2,
//!     };
//!     let engine = SearchEngine::new(&config, pool, request)?;
//!     let report = engine.run(groups).await;
//!     println!("{}", report.summary());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Group selection and resolution
pub mod groups;
/// NZB serialization
pub mod nzb;
/// Bounded NNTP connection pool
pub mod pool;
/// Date location, range scanning and per-group orchestration
pub mod search;
/// NNTP session abstraction
pub mod session;
/// Aggregation of parsed messages into releases
pub mod store;
/// Subject parsing
pub mod subject;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, SearchConfig, ServerConfig, TimeoutConfig};
pub use error::{Error, ParseError, Result, SearchError};
pub use groups::GroupSource;
pub use nzb::NzbWriter;
pub use pool::{ConnectionPool, PooledSession};
pub use search::{GroupOutcome, GroupResult, SearchEngine, SearchReport, SearchRequest};
pub use session::{Connector, NntpConnector, NntpSession};
pub use store::{AggregationStore, FileEntry, Header};
pub use subject::SubjectParser;
pub use types::{
    ArticleRef, Boundary, GroupBounds, LocatedArticle, Message, OverviewRecord, SearchWindow,
};

/// Run a search over `groups`, abandoning it on a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// In-flight chunk and group tasks are aborted when the signal arrives; NZB files already
/// written stay on disk.
///
/// # Errors
///
/// Returns [`Error::Other`] if the search was interrupted.
pub async fn run_with_shutdown(engine: &SearchEngine, groups: Vec<String>) -> Result<SearchReport> {
    tokio::select! {
        report = engine.run(groups) => Ok(report),
        _ = wait_for_signal() => {
            tracing::warn!("Search interrupted, remaining groups are skipped");
            Err(Error::Other("search interrupted".to_string()))
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_err() {
                // no way to observe a signal; never resolve so the search runs to completion
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
