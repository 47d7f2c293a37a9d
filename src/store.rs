//! Aggregation store for parsed messages
//!
//! Messages are grouped per newsgroup into headers (releases) and files, keyed only by
//! the hashes the subject parser derived. Each group owns its own bucket behind a mutex, so
//! concurrent [`AggregationStore::record`] calls for the same group serialize while
//! different groups never contend beyond the short lookup of their bucket.

use crate::types::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// One file of a release
#[derive(Clone, Debug)]
pub struct FileEntry {
    /// File identity
    pub hash: String,
    /// Filename
    pub name: String,
    /// Poster of the first observed segment
    pub poster: String,
    /// Subject of the first observed segment
    pub subject: String,
    /// Posting time of the first observed segment (Unix timestamp)
    pub date: i64,
    /// Position of the file inside the release
    pub number: u32,
    /// Segments the file is announced with
    pub total_segments: u32,
    /// Groups the file was found in
    pub groups: Vec<String>,
    /// Segments in recording order
    pub messages: Vec<Message>,
}

impl FileEntry {
    fn from_message(message: &Message) -> Self {
        Self {
            hash: message.file_hash.clone(),
            name: message.filename.clone(),
            poster: message.from.clone(),
            subject: message.subject.clone(),
            date: message.date,
            number: message.file_no,
            total_segments: message.total_segments,
            groups: vec![message.article.group.clone()],
            messages: Vec::with_capacity(message.total_segments.min(1024) as usize),
        }
    }

    /// Total size of the recorded segments in bytes
    pub fn bytes(&self) -> u64 {
        self.messages.iter().map(|m| m.bytes).sum()
    }
}

/// A release found in one group
#[derive(Clone, Debug)]
pub struct Header {
    /// Release identity
    pub hash: String,
    /// Display name
    pub name: String,
    /// Owning group
    pub group: String,
    /// Files keyed by file hash
    pub files: HashMap<String, FileEntry>,
}

impl Header {
    /// Number of recorded segments over all files
    pub fn message_count(&self) -> usize {
        self.files.values().map(|f| f.messages.len()).sum()
    }
}

type Bucket = Arc<Mutex<HashMap<String, Header>>>;

/// Concurrent group → header → file → segments map
#[derive(Default)]
pub struct AggregationStore {
    groups: RwLock<HashMap<String, Bucket>>,
}

impl AggregationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    async fn bucket(&self, group: &str) -> Bucket {
        if let Some(bucket) = self.groups.read().await.get(group) {
            return bucket.clone();
        }
        self.groups
            .write()
            .await
            .entry(group.to_string())
            .or_default()
            .clone()
    }

    /// Append `message` to the file its hashes select, creating header and file on first use
    pub async fn record(&self, group: &str, message: Message) {
        let bucket = self.bucket(group).await;
        let mut headers = bucket.lock().await;

        let header = headers
            .entry(message.header_hash.clone())
            .or_insert_with(|| Header {
                hash: message.header_hash.clone(),
                name: message.name.clone(),
                group: group.to_string(),
                files: HashMap::new(),
            });
        header
            .files
            .entry(message.file_hash.clone())
            .or_insert_with(|| FileEntry::from_message(&message))
            .messages
            .push(message);
    }

    /// Take all headers recorded for `group`, ordered by name
    ///
    /// Only call once every scan task of the group has finished; records arriving later
    /// start a new bucket.
    pub async fn drain(&self, group: &str) -> Vec<Header> {
        let Some(bucket) = self.groups.write().await.remove(group) else {
            return Vec::new();
        };
        let mut headers: Vec<Header> = std::mem::take(&mut *bucket.lock().await)
            .into_values()
            .collect();
        headers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.hash.cmp(&b.hash)));
        headers
    }

    /// Number of headers currently recorded for `group`
    pub async fn header_count(&self, group: &str) -> usize {
        match self.groups.read().await.get(group) {
            Some(bucket) => bucket.lock().await.len(),
            None => 0,
        }
    }
}
