//! NNTP session seam
//!
//! The search engine only needs four commands from a server: GROUP, OVER, LIST ACTIVE and
//! QUIT. [`NntpSession`] abstracts exactly those so the locator, scanner and group
//! resolution can run against a synthetic server in tests. [`NntpConnector`] is the
//! production [`Connector`] built on the `nntp-rs` client.

use crate::config::ServerConfig;
use crate::types::{GroupBounds, OverviewRecord};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// One authenticated connection to a news server
#[async_trait::async_trait]
pub trait NntpSession: Send {
    /// Select a group and return its article range
    async fn select_group(&mut self, group: &str) -> nntp_rs::Result<GroupBounds>;

    /// Fetch overview records for the inclusive article range `first..=last` of the
    /// selected group, ordered by article number
    async fn overview(&mut self, first: u64, last: u64) -> nntp_rs::Result<Vec<OverviewRecord>>;

    /// List the names of active groups matching a wildmat
    async fn list_active(&mut self, wildmat: &str) -> nntp_rs::Result<Vec<String>>;

    /// Close the session
    async fn quit(&mut self) -> nntp_rs::Result<()>;
}

/// Opens new sessions (dial, optional TLS, authentication)
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Open and authenticate a fresh session
    async fn connect(&self) -> nntp_rs::Result<Box<dyn NntpSession>>;
}

/// Run `fut` with a deadline, mapping expiry to [`nntp_rs::NntpError::Timeout`]
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> nntp_rs::Result<T>
where
    F: Future<Output = nntp_rs::Result<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(nntp_rs::NntpError::Timeout),
    }
}

/// Production [`Connector`] dialing a real server through `nntp-rs`
pub struct NntpConnector {
    config: Arc<nntp_rs::ServerConfig>,
    authenticate: bool,
}

impl NntpConnector {
    /// Create a connector for the configured server
    pub fn new(server: &ServerConfig) -> Self {
        Self {
            authenticate: server.has_credentials(),
            config: Arc::new(server.clone().into()),
        }
    }
}

#[async_trait::async_trait]
impl Connector for NntpConnector {
    async fn connect(&self) -> nntp_rs::Result<Box<dyn NntpSession>> {
        let mut client = nntp_rs::NntpClient::connect(self.config.clone()).await?;
        if self.authenticate {
            client.authenticate().await?;
        }
        Ok(Box::new(ClientSession { client }))
    }
}

/// [`NntpSession`] backed by an `nntp-rs` client
struct ClientSession {
    client: nntp_rs::NntpClient,
}

#[async_trait::async_trait]
impl NntpSession for ClientSession {
    async fn select_group(&mut self, group: &str) -> nntp_rs::Result<GroupBounds> {
        let nntp_rs::GroupInfo { count, first, last } = self.client.select_group(group).await?;
        Ok(GroupBounds { count, first, last })
    }

    async fn overview(&mut self, first: u64, last: u64) -> nntp_rs::Result<Vec<OverviewRecord>> {
        let entries = self.client.over(&format!("{}-{}", first, last)).await?;
        let mut records: Vec<OverviewRecord> =
            entries.into_iter().filter_map(overview_record).collect();
        records.sort_by_key(|r| r.number);
        Ok(records)
    }

    async fn list_active(&mut self, wildmat: &str) -> nntp_rs::Result<Vec<String>> {
        let groups = self.client.list_active(wildmat).await?;
        Ok(groups.into_iter().map(|g| g.name).collect())
    }

    async fn quit(&mut self) -> nntp_rs::Result<()> {
        self.client.quit().await
    }
}

/// Convert an overview line into a record, dropping entries without a usable date
fn overview_record(entry: nntp_rs::XoverEntry) -> Option<OverviewRecord> {
    let date = match nntp_rs::parse_date(entry.date.trim()) {
        Ok(date) => date.timestamp(),
        Err(e) => {
            tracing::debug!(
                article = entry.article_number,
                date = %entry.date,
                error = %e,
                "Skipping overview record with unparseable date"
            );
            return None;
        }
    };
    Some(OverviewRecord {
        number: entry.article_number,
        message_id: entry.message_id,
        subject: entry.subject,
        from: entry.author,
        bytes: entry.bytes as u64,
        date,
    })
}
