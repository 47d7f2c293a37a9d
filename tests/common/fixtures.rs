//! Synthetic news server and article fixtures for integration tests

use async_trait::async_trait;
use nzb_search::{Connector, ConnectionPool, GroupBounds, NntpSession, OverviewRecord};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 2024-01-01 00:00:00 UTC
pub const JAN_1_2024: i64 = 1_704_067_200;

/// Seconds per day
pub const DAY: i64 = 86_400;

/// News server held in memory, shared by every session it hands out
#[derive(Clone, Default)]
pub struct FixtureServer {
    groups: Arc<Mutex<BTreeMap<String, Vec<OverviewRecord>>>>,
    sessions: Arc<AtomicUsize>,
}

impl FixtureServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group; records are sorted by article number
    pub fn add_group(&self, name: &str, mut records: Vec<OverviewRecord>) {
        records.sort_by_key(|r| r.number);
        self.groups
            .lock()
            .unwrap()
            .insert(name.to_string(), records);
    }

    /// Sessions opened so far
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Pool of `size` connections to this server
    pub fn pool(&self, size: usize) -> ConnectionPool {
        ConnectionPool::new(
            Arc::new(self.clone()),
            size,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
    }
}

#[async_trait]
impl Connector for FixtureServer {
    async fn connect(&self) -> nntp_rs::Result<Box<dyn NntpSession>> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureSession {
            groups: self.groups.clone(),
            selected: None,
        }))
    }
}

struct FixtureSession {
    groups: Arc<Mutex<BTreeMap<String, Vec<OverviewRecord>>>>,
    selected: Option<String>,
}

#[async_trait]
impl NntpSession for FixtureSession {
    async fn select_group(&mut self, group: &str) -> nntp_rs::Result<GroupBounds> {
        let groups = self.groups.lock().unwrap();
        let records = groups
            .get(group)
            .ok_or_else(|| nntp_rs::NntpError::NoSuchGroup(group.to_string()))?;
        self.selected = Some(group.to_string());
        Ok(match (records.first(), records.last()) {
            (Some(first), Some(last)) => GroupBounds::new(first.number, last.number),
            _ => GroupBounds {
                count: 0,
                first: 1,
                last: 0,
            },
        })
    }

    async fn overview(&mut self, first: u64, last: u64) -> nntp_rs::Result<Vec<OverviewRecord>> {
        let group = self
            .selected
            .as_ref()
            .ok_or(nntp_rs::NntpError::NoGroupSelected)?;
        let groups = self.groups.lock().unwrap();
        Ok(groups
            .get(group)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| (first..=last).contains(&r.number))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_active(&mut self, wildmat: &str) -> nntp_rs::Result<Vec<String>> {
        let prefix = wildmat.trim_end_matches('*');
        Ok(self
            .groups
            .lock()
            .unwrap()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn quit(&mut self) -> nntp_rs::Result<()> {
        Ok(())
    }
}

/// One yEnc-posted file of a release
pub struct PostedFile<'a> {
    pub filename: &'a str,
    pub segments: u32,
}

/// Overview records of a release posted as `[i/n] - "file" yEnc (s/m)` starting at article
/// `first`, one article every `interval` seconds from `posted`
pub fn release_records(
    release: &str,
    files: &[PostedFile<'_>],
    first: u64,
    posted: i64,
    interval: i64,
) -> Vec<OverviewRecord> {
    let mut records = Vec::new();
    let mut number = first;
    for (index, file) in files.iter().enumerate() {
        for segment in 1..=file.segments {
            let offset = (number - first) as i64;
            records.push(OverviewRecord {
                number,
                message_id: format!("<{}.{}@fixture.example>", release, number),
                subject: format!(
                    r#"{} [{}/{}] - "{}" yEnc ({}/{})"#,
                    release,
                    index + 1,
                    files.len(),
                    file.filename,
                    segment,
                    file.segments
                ),
                from: "uploader@fixture.example".to_string(),
                bytes: 750_000,
                date: posted + offset * interval,
            });
            number += 1;
        }
    }
    records
}

/// Unrelated chatter filling article numbers `first..=last`, one article every `interval`
/// seconds from `posted`
pub fn noise_records(first: u64, last: u64, posted: i64, interval: i64) -> Vec<OverviewRecord> {
    (first..=last)
        .map(|number| OverviewRecord {
            number,
            message_id: format!("<noise.{}@fixture.example>", number),
            subject: format!("Re: unrelated discussion #{}", number),
            from: "someone@fixture.example".to_string(),
            bytes: 2_000,
            date: posted + (number - first) as i64 * interval,
        })
        .collect()
}
