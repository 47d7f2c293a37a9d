//! Connection pool handing out NNTP sessions
//!
//! Capacity is a counting semaphore. Each [`ConnectionPool::acquire`] waits for a free slot
//! and then dials and authenticates a fresh session; sessions are not reused. The slot is
//! returned when the [`PooledSession`] is released or dropped, including when the dial or
//! authentication fails.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::{Connector, NntpConnector, NntpSession, with_deadline};
use crate::types::{GroupBounds, OverviewRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Bounded pool of NNTP sessions (cloneable, all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ConnectionPool {
    connector: Arc<dyn Connector>,
    permits: Arc<Semaphore>,
    max_size: usize,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl ConnectionPool {
    /// Create a pool of at most `max_size` concurrent sessions
    pub fn new(
        connector: Arc<dyn Connector>,
        max_size: usize,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Self {
        debug!(
            max_size,
            connect_timeout_secs = connect_timeout.as_secs(),
            command_timeout_secs = command_timeout.as_secs(),
            "Creating NNTP connection pool"
        );
        Self {
            connector,
            permits: Arc::new(Semaphore::new(max_size)),
            max_size,
            connect_timeout,
            command_timeout,
        }
    }

    /// Create a pool dialing the configured server
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(NntpConnector::new(&config.server)),
            config.server.connections,
            config.timeouts.connect(),
            config.timeouts.command(),
        )
    }

    /// Wait for a free slot, then dial and authenticate a new session
    ///
    /// # Errors
    ///
    /// Returns [`Error::Nntp`] if the dial or authentication fails or exceeds the connect
    /// deadline. The slot is released again in that case.
    pub async fn acquire(&self) -> Result<PooledSession> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Other(format!("connection pool closed: {}", e)))?;

        let session = with_deadline(self.connect_timeout, self.connector.connect())
            .await
            .map_err(|e| Error::Nntp(format!("connection to usenet server failed: {}", e)))?;

        Ok(PooledSession {
            session,
            command_timeout: self.command_timeout,
            _permit: permit,
        })
    }

    /// Number of slots currently free
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Configured capacity
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

/// A session checked out of a [`ConnectionPool`]
///
/// Every command is bounded by the pool's command deadline. Dropping it frees the slot;
/// [`PooledSession::release`] additionally sends QUIT first.
pub struct PooledSession {
    session: Box<dyn NntpSession>,
    command_timeout: Duration,
    _permit: OwnedSemaphorePermit,
}

impl PooledSession {
    /// Say goodbye to the server and return the slot to the pool
    pub async fn release(mut self) {
        if let Err(e) = with_deadline(self.command_timeout, self.session.quit()).await {
            debug!(error = %e, "QUIT failed while releasing session");
        }
    }
}

#[async_trait::async_trait]
impl NntpSession for PooledSession {
    async fn select_group(&mut self, group: &str) -> nntp_rs::Result<GroupBounds> {
        with_deadline(self.command_timeout, self.session.select_group(group)).await
    }

    async fn overview(&mut self, first: u64, last: u64) -> nntp_rs::Result<Vec<OverviewRecord>> {
        with_deadline(self.command_timeout, self.session.overview(first, last)).await
    }

    async fn list_active(&mut self, wildmat: &str) -> nntp_rs::Result<Vec<String>> {
        with_deadline(self.command_timeout, self.session.list_active(wildmat)).await
    }

    async fn quit(&mut self) -> nntp_rs::Result<()> {
        with_deadline(self.command_timeout, self.session.quit()).await
    }
}
