//! Group search orchestration
//!
//! Split into focused submodules:
//! - [`locator`] - Binary search from a date to an article number
//! - [`scanner`] - Chunked, pool-bounded overview scanning of an article range
//!
//! [`SearchEngine`] ties them together: per group it locates the window's end and start
//! articles on one session, scans the range between them, drains the aggregation store
//! and writes one NZB per release found. Groups run in parallel up to
//! `parallel_scans`, chunks in parallel up to the pool size.

pub mod locator;
pub mod scanner;


pub use locator::locate_boundary;
pub use scanner::{RangeScanner, ScanSummary, chunk_ranges};

use crate::config::Config;
use crate::error::{Error, Result, SearchError};
use crate::nzb::NzbWriter;
use crate::pool::ConnectionPool;
use crate::session::NntpSession;
use crate::store::AggregationStore;
use crate::subject::SubjectParser;
use crate::types::{Boundary, GroupBounds, LocatedArticle, SearchWindow};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// What to search for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    /// Text the subject must contain (case-insensitive)
    pub term: String,
    /// Day the release was posted (UTC)
    pub post_date: NaiveDate,
    /// Days to search back from the post date
    pub days: u32,
}

impl SearchRequest {
    /// Time window this request covers
    pub fn window(&self) -> SearchWindow {
        SearchWindow::from_post_date(self.post_date, self.days)
    }
}

/// Result of a successful group search
#[derive(Debug, Default)]
pub struct GroupResult {
    /// First article of the scanned range
    pub start: u64,
    /// Last article of the scanned range
    pub end: u64,
    /// Scan statistics
    pub scan: ScanSummary,
    /// Releases found
    pub headers: usize,
    /// NZB files written
    pub saved: Vec<PathBuf>,
}

/// Per-group entry of a [`SearchReport`]
#[derive(Debug)]
pub struct GroupOutcome {
    /// Group name
    pub group: String,
    /// Search result, or why the group was abandoned
    pub result: Result<GroupResult>,
}

/// Summary of a whole run
#[derive(Debug)]
pub struct SearchReport {
    /// One entry per requested group, ordered by group name
    pub outcomes: Vec<GroupOutcome>,
    /// Records processed over all groups
    pub processed: u64,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl SearchReport {
    /// Processed records per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    /// All NZB files written during the run
    pub fn saved(&self) -> impl Iterator<Item = &PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .flat_map(|r| r.saved.iter())
    }

    /// Groups whose search failed
    pub fn failures(&self) -> impl Iterator<Item = &GroupOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Final report line
    pub fn summary(&self) -> String {
        format!(
            "A total of {} messages were processed in {:.2?} ({:.0} messages/s)",
            self.processed,
            self.elapsed,
            self.throughput()
        )
    }
}

/// Runs one search over any number of groups
///
/// Cloning is cheap; clones share the pool, store, scanner and group limit.
#[derive(Clone)]
pub struct SearchEngine {
    pool: ConnectionPool,
    scanner: RangeScanner,
    store: Arc<AggregationStore>,
    writer: NzbWriter,
    window: SearchWindow,
    group_permits: Arc<Semaphore>,
}

impl SearchEngine {
    /// Build an engine for `request` with the limits and output settings of `config`
    pub fn new(config: &Config, pool: ConnectionPool, request: SearchRequest) -> Result<Self> {
        let parser = Arc::new(SubjectParser::new(&request.term)?);
        let store = Arc::new(AggregationStore::new());
        let window = request.window();

        Ok(Self {
            scanner: RangeScanner::new(
                pool.clone(),
                parser,
                store.clone(),
                window,
                config.search.step,
            ),
            pool,
            store,
            writer: NzbWriter::new(&config.search.path, config.search.sort_segments),
            window,
            group_permits: Arc::new(Semaphore::new(config.search.parallel_scans.max(1))),
        })
    }

    /// Time window searched
    pub fn window(&self) -> SearchWindow {
        self.window
    }

    /// Search all `groups`, at most `parallel_scans` at a time
    ///
    /// A failing group is logged and reported; the others continue.
    pub async fn run(&self, groups: Vec<String>) -> SearchReport {
        let started = Instant::now();
        let mut tasks = JoinSet::new();

        for group in groups {
            let engine = self.clone();
            tasks.spawn(async move {
                let result = match engine.group_permits.clone().acquire_owned().await {
                    Ok(_permit) => engine.search_group(&group).await,
                    Err(e) => Err(Error::Other(format!("group limiter closed: {}", e))),
                };
                if let Err(e) = &result {
                    error!(group = %group, error = %e, "Search in group failed");
                }
                GroupOutcome { group, result }
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "Group search task panicked"),
            }
        }
        outcomes.sort_by(|a, b| a.group.cmp(&b.group));

        SearchReport {
            outcomes,
            processed: self.scanner.processed(),
            elapsed: started.elapsed(),
        }
    }

    /// Search one group and write an NZB per release found
    ///
    /// # Errors
    ///
    /// Fails if the group cannot be selected, its window cannot be located or the window is
    /// empty. NZB write failures are logged per release and do not fail the group.
    pub async fn search_group(&self, group: &str) -> Result<GroupResult> {
        info!(group, "Retrieving group information from the usenet server");
        let (start, end) = self.locate_window(group).await?;

        info!(
            group,
            start = start.number,
            end = end.number,
            from = %start.datetime(),
            to = %end.datetime(),
            "Start searching messages"
        );
        let scan = self.scanner.scan(group, start.number, end.number).await;
        info!(
            group,
            processed = scan.processed,
            failed_chunks = scan.failed_chunks,
            "Finished searching in group"
        );

        let headers = self.store.drain(group).await;
        if headers.is_empty() {
            info!(group, "No matching releases found in group");
        }

        let mut saved = Vec::with_capacity(headers.len());
        for header in &headers {
            info!(
                group,
                header = %header.name,
                files = header.files.len(),
                segments = header.message_count(),
                "Found header"
            );
            match self.writer.save(header, group).await {
                Ok(path) => saved.push(path),
                Err(e) => warn!(group, header = %header.name, error = %e, "Failed to save NZB"),
            }
        }

        Ok(GroupResult {
            start: start.number,
            end: end.number,
            scan,
            headers: headers.len(),
            saved,
        })
    }

    /// Locate the end and start article of the window on one session
    async fn locate_window(&self, group: &str) -> Result<(LocatedArticle, LocatedArticle)> {
        let mut session = self.pool.acquire().await?;
        let located = self.locate_on(&mut session, group).await;
        session.release().await;

        let (start, end) = located?;
        if start.number >= end.number {
            return Err(SearchError::EmptyWindow {
                group: group.to_string(),
                start: start.number,
                end: end.number,
            }
            .into());
        }
        Ok((start, end))
    }

    async fn locate_on(
        &self,
        session: &mut dyn NntpSession,
        group: &str,
    ) -> Result<(LocatedArticle, LocatedArticle)> {
        let bounds = session.select_group(group).await.map_err(|e| {
            Error::Nntp(format!("failed to select group '{}': {}", group, e))
        })?;
        debug!(group, first = bounds.first, last = bounds.last, "Group bounds");

        let end = locate_boundary(session, group, bounds, self.window.newest, Boundary::End).await?;
        debug!(group, article = end.number, date = %end.datetime(), "Located end of search");

        let below_end = GroupBounds {
            last: end.number,
            ..bounds
        };
        let start =
            locate_boundary(session, group, below_end, self.window.oldest, Boundary::Start).await?;
        debug!(group, article = start.number, date = %start.datetime(), "Located start of search");

        Ok((start, end))
    }
}
