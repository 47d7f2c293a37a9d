//! Date locator: binary search from a timestamp to an article number
//!
//! Servers expose no date index, so the locator samples overview records at chosen article
//! numbers. It keeps a bracket: `older`, an article known to be posted before the target,
//! and `newer`, a number at or past the crossing. Every lookup reads the first article that
//! actually exists at or after the midpoint, so cancelled or expired ranges move the bracket
//! instead of being mistaken for the requested number. Once the bracket is narrower than
//! [`LINEAR_SCAN_THRESHOLD`] the locator reads forward from a little before `older` and picks
//! the first article at or after the target, which absorbs locally out-of-order dates.

use crate::error::{Error, Result, SearchError};
use crate::session::NntpSession;
use crate::types::{Boundary, GroupBounds, LocatedArticle, OverviewRecord};
use tracing::debug;

/// Overview window of the first lookup at the group's first article, and of every
/// follow-up request while a lookup walks across a gap
///
/// Wide because the oldest numbers of a group are often expired or cancelled.
pub const FIRST_LOOKUP_WINDOW: u64 = 2000;

/// Overview window of the first request of every later lookup
pub const LOOKUP_WINDOW: u64 = 16;

/// Bracket width below which the search switches to a linear scan
pub const LINEAR_SCAN_THRESHOLD: u64 = 1000;

/// Articles read before the lower end of the bracket during the linear scan
pub const DISORDER_MARGIN: u64 = 64;

/// Articles requested per overview call of the linear scan
pub const LINEAR_SCAN_WINDOW: u64 = LINEAR_SCAN_THRESHOLD + 2 * DISORDER_MARGIN;

/// Find the article where `target` is crossed
///
/// Returns the first article posted at or after `target`, or the group's newest article
/// when no article is that new. If even the oldest article is not older than `target`,
/// a [`Boundary::Start`] search returns that article while a [`Boundary::End`] search
/// fails with [`SearchError::PredatesRetention`].
///
/// `session` must already have the group selected.
pub async fn locate_boundary(
    session: &mut dyn NntpSession,
    group: &str,
    bounds: GroupBounds,
    target: i64,
    boundary: Boundary,
) -> Result<LocatedArticle> {
    if bounds.is_empty() {
        return Err(SearchError::EmptyGroup {
            group: group.to_string(),
        }
        .into());
    }

    let oldest = fetch(session, group, bounds.first, bounds.first + FIRST_LOOKUP_WINDOW, bounds)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| exhausted(group, bounds.first))?;

    if oldest.date >= target {
        return match boundary {
            Boundary::Start => Ok(located(&oldest)),
            Boundary::End => Err(SearchError::PredatesRetention {
                group: group.to_string(),
            }
            .into()),
        };
    }

    let mut older = oldest.number;
    let mut newer = bounds.last.saturating_add(1);

    while newer - older > LINEAR_SCAN_THRESHOLD {
        let middle = older + (newer - older) / 2;
        match first_article_from(session, group, middle, newer - 1, bounds).await? {
            Some(found) if found.date < target => older = found.number,
            Some(found) => newer = found.number,
            // nothing exists between the midpoint and the upper end
            None => newer = middle,
        }
        debug!(group, older, newer, "Narrowed search bracket");
    }

    linear_scan(session, group, older, target, bounds).await
}

/// First article in `from..=until`, read in growing windows so gaps are crossed
async fn first_article_from(
    session: &mut dyn NntpSession,
    group: &str,
    from: u64,
    until: u64,
    bounds: GroupBounds,
) -> Result<Option<LocatedArticle>> {
    let mut first = from;
    let mut window = LOOKUP_WINDOW;
    while first <= until {
        let last = first.saturating_add(window).min(until);
        if let Some(record) = fetch(session, group, first, last, bounds).await?.first() {
            debug!(
                group,
                requested = from,
                article = record.number,
                date = record.date,
                "Found article"
            );
            return Ok(Some(located(record)));
        }
        first = last.saturating_add(1);
        window = FIRST_LOOKUP_WINDOW;
    }
    Ok(None)
}

/// Read forward from just before `older` until an article reaches `target`
///
/// Runs to the group's newest article if necessary and returns that one when the target
/// is never reached.
async fn linear_scan(
    session: &mut dyn NntpSession,
    group: &str,
    older: u64,
    target: i64,
    bounds: GroupBounds,
) -> Result<LocatedArticle> {
    let mut first = older.saturating_sub(DISORDER_MARGIN).max(bounds.first);
    let mut newest = None;
    loop {
        let last = first.saturating_add(LINEAR_SCAN_WINDOW - 1).min(bounds.last);
        let records = fetch(session, group, first, last, bounds).await?;
        if let Some(record) = records.iter().find(|r| r.date >= target) {
            return Ok(located(record));
        }
        if let Some(record) = records.last() {
            newest = Some(located(record));
        }
        if last >= bounds.last {
            break;
        }
        first = last + 1;
    }
    newest.ok_or_else(|| exhausted(group, older))
}

/// Overview of `first..=last`, clamped to the group bounds
async fn fetch(
    session: &mut dyn NntpSession,
    group: &str,
    first: u64,
    last: u64,
    bounds: GroupBounds,
) -> Result<Vec<OverviewRecord>> {
    session
        .overview(first, last.min(bounds.last))
        .await
        .map_err(|e| {
            Error::Nntp(format!(
                "overview of {}-{} in '{}' failed: {}",
                first, last, group, e
            ))
        })
}

fn located(record: &OverviewRecord) -> LocatedArticle {
    LocatedArticle {
        number: record.number,
        date: record.date,
    }
}

fn exhausted(group: &str, article: u64) -> Error {
    SearchError::Exhausted {
        group: group.to_string(),
        article,
    }
    .into()
}
