//! Resolution of the user's group selection into concrete group names

use crate::error::{Error, Result};
use crate::pool::ConnectionPool;
use crate::session::NntpSession;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Selects every group the server carries
pub const ALL_GROUPS: &str = "ALL";

/// Selects every `alt.binaries.*` group the server carries
pub const ALL_BINARY_GROUPS: &str = "BINARIES";

/// Shorthand expanded at the start of group names
const BINARIES_SHORTHAND: &str = "a.b.";
const BINARIES_PREFIX: &str = "alt.binaries.";

/// Where the list of groups to search comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupSource {
    /// All groups (LIST ACTIVE)
    All,
    /// All binary groups (LIST ACTIVE alt.binaries.*)
    Binaries,
    /// A file with one group per line
    File(PathBuf),
    /// An explicit comma-separated list
    List(Vec<String>),
}

impl GroupSource {
    /// Interpret user input: a sentinel, an existing file, or a comma-separated list
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input {
            ALL_GROUPS => Self::All,
            ALL_BINARY_GROUPS => Self::Binaries,
            _ if !input.is_empty() && Path::new(input).is_file() => {
                Self::File(PathBuf::from(input))
            }
            _ => Self::List(input.split(',').map(str::to_string).collect()),
        }
    }

    /// Turn the selection into a list of unique group names
    ///
    /// The sentinels query the server through `pool`; files and lists do not touch the
    /// network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoGroups`] if the selection is empty, [`Error::Io`] if the groups
    /// file cannot be read and [`Error::Nntp`] if the server listing fails.
    pub async fn resolve(&self, pool: &ConnectionPool) -> Result<Vec<String>> {
        let names = match self {
            Self::All => list_active(pool, "*").await?,
            Self::Binaries => list_active(pool, &format!("{}*", BINARIES_PREFIX)).await?,
            Self::File(path) => {
                debug!(path = %path.display(), "Reading groups file");
                let text = tokio::fs::read_to_string(path).await?;
                text.lines().map(str::to_string).collect()
            }
            Self::List(names) => names.clone(),
        };

        let mut seen = HashSet::new();
        let groups: Vec<String> = names
            .iter()
            .filter_map(|name| normalize(name))
            .filter(|name| seen.insert(name.clone()))
            .collect();

        if groups.is_empty() {
            return Err(Error::NoGroups);
        }
        info!(count = groups.len(), "Groups to search");
        Ok(groups)
    }
}

/// Trim a group name and expand the `a.b.` shorthand; blank names are dropped
fn normalize(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(match name.strip_prefix(BINARIES_SHORTHAND) {
        Some(rest) => format!("{}{}", BINARIES_PREFIX, rest),
        None => name.to_string(),
    })
}

async fn list_active(pool: &ConnectionPool, wildmat: &str) -> Result<Vec<String>> {
    info!(wildmat, "Requesting list of groups from the usenet server");
    let mut session = pool.acquire().await?;
    let listed = session.list_active(wildmat).await;
    session.release().await;
    listed.map_err(|e| Error::Nntp(format!("failed to list groups: {}", e)))
}
