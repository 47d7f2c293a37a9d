//! Shared test helpers: an in-memory NNTP server implementing the session seam.

use crate::pool::ConnectionPool;
use crate::session::{Connector, NntpSession};
use crate::types::{GroupBounds, OverviewRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counters observed by the mock server
#[derive(Default)]
pub(crate) struct ServerStats {
    connects: AtomicUsize,
    quits: AtomicUsize,
    overview_calls: AtomicUsize,
    open_sessions: AtomicUsize,
    peak_sessions: AtomicUsize,
}

impl ServerStats {
    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    pub(crate) fn overview_calls(&self) -> usize {
        self.overview_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_sessions(&self) -> usize {
        self.peak_sessions.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Inner {
    groups: Mutex<HashMap<String, (GroupBounds, Vec<OverviewRecord>)>>,
    failing_articles: Mutex<Vec<u64>>,
    fail_connects: AtomicBool,
    connect_delay: Mutex<Option<Duration>>,
    overview_delay: Mutex<Option<Duration>>,
    stats: ServerStats,
}

/// In-memory news server; cloning shares state
#[derive(Clone, Default)]
pub(crate) struct MockServer {
    inner: Arc<Inner>,
}

impl MockServer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stats(&self) -> &ServerStats {
        &self.inner.stats
    }

    /// Add a group whose bounds are derived from its records
    pub(crate) fn add_group(&self, name: &str, mut records: Vec<OverviewRecord>) {
        records.sort_by_key(|r| r.number);
        let bounds = match (records.first(), records.last()) {
            (Some(first), Some(last)) => GroupBounds::new(first.number, last.number),
            _ => GroupBounds {
                count: 0,
                first: 1,
                last: 0,
            },
        };
        self.add_group_with_bounds(name, bounds, records);
    }

    pub(crate) fn add_group_with_bounds(
        &self,
        name: &str,
        bounds: GroupBounds,
        records: Vec<OverviewRecord>,
    ) {
        self.inner
            .groups
            .lock()
            .unwrap()
            .insert(name.to_string(), (bounds, records));
    }

    pub(crate) fn fail_connects(&self, fail: bool) {
        self.inner.fail_connects.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn connect_delay(&self, delay: Duration) {
        *self.inner.connect_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn overview_delay(&self, delay: Duration) {
        *self.inner.overview_delay.lock().unwrap() = Some(delay);
    }

    /// Make every overview request covering `article` fail
    pub(crate) fn fail_overview_at(&self, article: u64) {
        self.inner.failing_articles.lock().unwrap().push(article);
    }
}

#[async_trait::async_trait]
impl Connector for MockServer {
    async fn connect(&self) -> nntp_rs::Result<Box<dyn NntpSession>> {
        let delay = *self.inner.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner.fail_connects.load(Ordering::SeqCst) {
            return Err(nntp_rs::NntpError::AuthFailed("mock rejects login".into()));
        }
        let stats = &self.inner.stats;
        stats.connects.fetch_add(1, Ordering::SeqCst);
        let open = stats.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak_sessions.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            inner: self.inner.clone(),
            group: None,
        }))
    }
}

struct MockSession {
    inner: Arc<Inner>,
    group: Option<String>,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.inner.stats.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl NntpSession for MockSession {
    async fn select_group(&mut self, group: &str) -> nntp_rs::Result<GroupBounds> {
        let groups = self.inner.groups.lock().unwrap();
        let (bounds, _) = groups
            .get(group)
            .ok_or_else(|| nntp_rs::NntpError::NoSuchGroup(group.to_string()))?;
        self.group = Some(group.to_string());
        Ok(*bounds)
    }

    async fn overview(&mut self, first: u64, last: u64) -> nntp_rs::Result<Vec<OverviewRecord>> {
        self.inner.stats.overview_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.overview_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self
            .inner
            .failing_articles
            .lock()
            .unwrap()
            .iter()
            .any(|a| (first..=last).contains(a))
        {
            return Err(nntp_rs::NntpError::ConnectionClosed);
        }
        let group = self
            .group
            .as_ref()
            .ok_or(nntp_rs::NntpError::NoGroupSelected)?;
        let groups = self.inner.groups.lock().unwrap();
        let records = groups
            .get(group)
            .map(|(_, records)| {
                let start = records.partition_point(|r| r.number < first);
                let end = records.partition_point(|r| r.number <= last);
                records[start..end.max(start)].to_vec()
            })
            .unwrap_or_default();
        Ok(records)
    }

    async fn list_active(&mut self, wildmat: &str) -> nntp_rs::Result<Vec<String>> {
        let prefix = wildmat.trim_end_matches('*');
        let mut names: Vec<String> = self
            .inner
            .groups
            .lock()
            .unwrap()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn quit(&mut self) -> nntp_rs::Result<()> {
        self.inner.stats.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Pool over the mock server with generous deadlines
pub(crate) fn pool_for(server: &MockServer, size: usize) -> ConnectionPool {
    ConnectionPool::new(
        Arc::new(server.clone()),
        size,
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
}

/// Overview record with a subject and a date, other fields derived from the number
pub(crate) fn record(number: u64, date: i64, subject: &str) -> OverviewRecord {
    OverviewRecord {
        number,
        message_id: format!("<{}@mock.example>", number),
        subject: subject.to_string(),
        from: "poster@example.com".to_string(),
        bytes: 1_000 + number,
        date,
    }
}

/// Articles `first..=last` posted every `interval` seconds starting at `start`
pub(crate) fn linear_records(
    first: u64,
    last: u64,
    start: i64,
    interval: i64,
    subject: impl Fn(u64) -> String,
) -> Vec<OverviewRecord> {
    (first..=last)
        .map(|n| record(n, start + (n - first) as i64 * interval, &subject(n)))
        .collect()
}
