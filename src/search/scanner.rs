//! Range scanner: fans an article range out into overview chunks
//!
//! Every chunk runs as its own task and checks a session out of the shared pool, so the
//! number of chunks in flight is bounded by the pool size, not by the range length.

use crate::error::{Error, ParseError, Result};
use crate::pool::ConnectionPool;
use crate::session::NntpSession;
use crate::store::AggregationStore;
use crate::subject::SubjectParser;
use crate::types::{OverviewRecord, SearchWindow};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Split `first..=last` into contiguous inclusive ranges of at most `size` articles
pub fn chunk_ranges(first: u64, last: u64, size: u64) -> impl Iterator<Item = (u64, u64)> {
    let size = size.max(1);
    let mut next = Some(first).filter(|&f| f <= last);
    std::iter::from_fn(move || {
        let start = next?;
        let end = start.saturating_add(size - 1).min(last);
        next = end.checked_add(1).filter(|&n| n <= last);
        Some((start, end))
    })
}

/// Outcome of scanning one article range
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Chunks launched
    pub chunks: usize,
    /// Chunks that failed (connection, GROUP or OVER errors)
    pub failed_chunks: usize,
    /// Records inside the window that were handed to the parser
    pub processed: u64,
    /// Records that parsed and were recorded
    pub recorded: u64,
}

#[derive(Default)]
struct ChunkStats {
    processed: u64,
    recorded: u64,
}

/// Scans article ranges of a group and records every matching subject
///
/// Cloning is cheap; clones share the pool, parser, store and processed counter.
#[derive(Clone)]
pub struct RangeScanner {
    pool: ConnectionPool,
    parser: Arc<SubjectParser>,
    store: Arc<AggregationStore>,
    window: SearchWindow,
    chunk_size: u64,
    processed: Arc<AtomicU64>,
}

impl RangeScanner {
    /// Create a scanner requesting `chunk_size` articles per overview call
    pub fn new(
        pool: ConnectionPool,
        parser: Arc<SubjectParser>,
        store: Arc<AggregationStore>,
        window: SearchWindow,
        chunk_size: u64,
    ) -> Self {
        Self {
            pool,
            parser,
            store,
            window,
            chunk_size,
            processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records processed by this scanner and its clones so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Scan `first..=last` of `group`, returning once every chunk has finished
    ///
    /// A failing chunk is logged and counted; the remaining chunks still run.
    pub async fn scan(&self, group: &str, first: u64, last: u64) -> ScanSummary {
        let mut tasks = JoinSet::new();
        for (from, to) in chunk_ranges(first, last, self.chunk_size) {
            let scanner = self.clone();
            let group = group.to_string();
            tasks.spawn(async move {
                let result = scanner.scan_chunk(&group, from, to).await;
                (from, to, result)
            });
        }

        let mut summary = ScanSummary {
            chunks: tasks.len(),
            ..ScanSummary::default()
        };
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, _, Ok(stats))) => {
                    summary.processed += stats.processed;
                    summary.recorded += stats.recorded;
                }
                Ok((from, to, Err(e))) => {
                    warn!(group, from, to, error = %e, "Failed to scan message range");
                    summary.failed_chunks += 1;
                }
                Err(e) => {
                    warn!(group, error = %e, "Scan task panicked");
                    summary.failed_chunks += 1;
                }
            }
        }
        summary
    }

    async fn scan_chunk(&self, group: &str, first: u64, last: u64) -> Result<ChunkStats> {
        let mut session = self.pool.acquire().await?;
        let records = fetch_overview(&mut session, group, first, last).await;
        session.release().await;

        let mut stats = ChunkStats::default();
        for record in records? {
            if !self.window.accepts(record.date) {
                continue;
            }
            stats.processed += 1;
            self.processed.fetch_add(1, Ordering::Relaxed);

            match self.parser.parse(&record, group) {
                Ok(message) => {
                    self.store.record(group, message).await;
                    stats.recorded += 1;
                }
                Err(ParseError::TermNotFound) => {}
                Err(reason) => {
                    debug!(group, article = record.number, subject = %record.subject, %reason, "Skipping message");
                }
            }
        }
        Ok(stats)
    }
}

/// Select `group` and fetch the overview of `first..=last`, clamped to the group's range
async fn fetch_overview(
    session: &mut dyn NntpSession,
    group: &str,
    first: u64,
    last: u64,
) -> Result<Vec<OverviewRecord>> {
    let bounds = session.select_group(group).await.map_err(|e| {
        Error::Nntp(format!("failed to select group '{}': {}", group, e))
    })?;
    let first = first.max(bounds.first);
    let last = last.min(bounds.last);
    if first > last {
        return Ok(Vec::new());
    }

    debug!(group, first, last, "Loading message overview");
    session.overview(first, last).await.map_err(|e| {
        Error::Nntp(format!(
            "overview of {}-{} in '{}' failed: {}",
            first, last, group, e
        ))
    })
}
