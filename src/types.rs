//! Core types for nzb-search

use chrono::{DateTime, NaiveDate, Utc};

/// Seconds in one day
pub const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// Safety margin added to the user-supplied post date.
///
/// Uploads of large releases can take longer than a day to finish, so the window's upper
/// cutoff is pushed one day past midnight of the post date.
pub const POST_DATE_MARGIN: i64 = SECONDS_PER_DAY;

/// An article addressed by group and per-group article number
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArticleRef {
    /// Newsgroup the number belongs to
    pub group: String,
    /// Server-assigned article number
    pub number: u64,
}

impl std::fmt::Display for ArticleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group, self.number)
    }
}

/// Per-article metadata returned by an overview (OVER/XOVER) request
///
/// Transient: it only lives until the subject parser has looked at it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverviewRecord {
    /// Article number within the selected group
    pub number: u64,
    /// Message-ID including angle brackets, as sent by the server
    pub message_id: String,
    /// Subject header
    pub subject: String,
    /// From header (poster)
    pub from: String,
    /// Article size in bytes
    pub bytes: u64,
    /// Posting time as a Unix timestamp
    pub date: i64,
}

/// Article range of a group as reported by GROUP
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupBounds {
    /// Estimated number of articles
    pub count: u64,
    /// Lowest retained article number
    pub first: u64,
    /// Highest article number
    pub last: u64,
}

impl GroupBounds {
    /// Bounds with an explicit range (count estimated from the range)
    pub fn new(first: u64, last: u64) -> Self {
        Self {
            count: last.saturating_sub(first) + 1,
            first,
            last,
        }
    }

    /// True when the server reports no usable article range
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.last < self.first
    }
}

/// Which edge of the search window the date locator is looking for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// Newest qualifying article (end of the window)
    End,
    /// Oldest qualifying article (start of the window)
    Start,
}

/// Article found by the date locator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocatedArticle {
    /// Article number
    pub number: u64,
    /// Posting time as a Unix timestamp
    pub date: i64,
}

impl LocatedArticle {
    /// Posting time as a UTC datetime (epoch if out of range)
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.date, 0).unwrap_or_default()
    }
}

/// Time window a search covers
///
/// `newest` is the upper cutoff (post date plus [`POST_DATE_MARGIN`]); `oldest` lies
/// `days` days before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchWindow {
    /// Upper cutoff; articles posted at or after it are ignored
    pub newest: i64,
    /// Lower edge of the window
    pub oldest: i64,
}

impl SearchWindow {
    /// Window ending at `anchor` and reaching `days` days back
    pub fn from_anchor(anchor: i64, days: u32) -> Self {
        Self {
            newest: anchor,
            oldest: anchor - SECONDS_PER_DAY * i64::from(days),
        }
    }

    /// Window for a release posted on `post_date` (UTC), searched `days` days back
    pub fn from_post_date(post_date: NaiveDate, days: u32) -> Self {
        let midnight = post_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        Self::from_anchor(midnight + POST_DATE_MARGIN, days)
    }

    /// True if a record posted at `date` lies before the upper cutoff
    pub fn accepts(&self, date: i64) -> bool {
        date < self.newest
    }
}

/// One successfully parsed overview record
///
/// Immutable once built by the subject parser. `header_hash` and `file_hash` are the only
/// keys the aggregation store uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Group and article number
    pub article: ArticleRef,
    /// Message-ID without angle brackets
    pub message_id: String,
    /// Decoded subject
    pub subject: String,
    /// Poster
    pub from: String,
    /// Article size in bytes
    pub bytes: u64,
    /// Posting time as a Unix timestamp
    pub date: i64,
    /// Header text captured from the subject (may be empty when only a filename was found)
    pub header: String,
    /// Release name used for identity and display
    pub name: String,
    /// Full filename
    pub filename: String,
    /// Filename without its extension
    pub base_filename: String,
    /// Position of the file inside the release
    pub file_no: u32,
    /// Number of files in the release
    pub total_files: u32,
    /// Position of this segment inside the file
    pub segment_no: u32,
    /// Number of segments of the file
    pub total_segments: u32,
    /// Identity of the release
    pub header_hash: String,
    /// Identity of the file inside the release
    pub file_hash: String,
}
