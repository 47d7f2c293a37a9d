//! Error types for nzb-search
//!
//! Errors are split along the failure classes of a search run:
//! - [`Error`] covers anything that aborts a task (a chunk, a boundary search, a group run)
//!   or, for configuration problems, the whole process
//! - [`SearchError`] describes why a group's date window could not be located
//! - [`ParseError`] describes why a single overview record was rejected; these never
//!   escalate beyond the message they belong to

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nzb-search operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nzb-search
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "path")
        key: Option<String>,
    },

    /// NNTP protocol or connection error (dial, auth, group select, overview)
    #[error("NNTP error: {0}")]
    Nntp(String),

    /// The date window of a group could not be resolved
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Failed to write an NZB file
    #[error("failed to save NZB '{path}': {source}")]
    Save {
        /// Target path of the NZB file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Group-set resolution produced no groups
    #[error("no groups found")]
    NoGroups,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Config`] for a specific configuration key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failures while locating the article range of a group
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The group reports no articles
    #[error("group '{group}' has no articles")]
    EmptyGroup {
        /// Group name
        group: String,
    },

    /// The requested end of the window is older than the oldest retained article
    #[error("post date is older than oldest message of group '{group}'")]
    PredatesRetention {
        /// Group name
        group: String,
    },

    /// The located start boundary is not before the end boundary
    #[error("no messages found within search range of group '{group}' ({start} >= {end})")]
    EmptyWindow {
        /// Group name
        group: String,
        /// Located start article
        start: u64,
        /// Located end article
        end: u64,
    },

    /// The article number space ran out without crossing the target date
    #[error("no messages found at or after article {article} in group '{group}'")]
    Exhausted {
        /// Group name
        group: String,
        /// Article number where probing found nothing
        article: u64,
    },
}

/// Per-message subject parse rejections
///
/// These are expected for most overview records and are only logged at debug level.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The subject does not contain the search term
    #[error("subject does not contain the search term")]
    TermNotFound,

    /// No segment counter like `(3/50)` was found
    #[error("subject did not match")]
    SubjectDidNotMatch,

    /// Neither a header prefix nor a base filename could be extracted
    #[error("no header found")]
    NoHeader,

    /// No filename could be extracted
    #[error("no filename found")]
    NoFilename,
}
