//! Unread projection.
//!
//! Intersects the current fused summaries with the acknowledgement store
//! to produce the live unread set for the notification list and badge.
//! A region is unread when its severity is active and its *current*
//! identity has no unexpired acknowledgement - so a region that escalates
//! or gains a source type after being marked read becomes unread again.

use chrono::{DateTime, Utc};

use crate::alert::acknowledgements::AckStore;
use crate::model::RegionSummary;
use crate::storage::KvStore;

/// The unread subset of `summaries`, ordered severity descending, ties
/// broken by most recent update first (notification-list display order).
pub fn unread<S: KvStore>(
    store: &mut AckStore<S>,
    summaries: &[RegionSummary],
    now: DateTime<Utc>,
) -> Vec<RegionSummary> {
    let mut result: Vec<RegionSummary> = summaries
        .iter()
        .filter(|s| s.severity.is_active() && !store.is_acknowledged(s, now))
        .cloned()
        .collect();

    result.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.last_updated.cmp(&a.last_updated))
    });
    result
}

/// Exact size of the unread set. Capping for display ("99+") is the
/// caller's presentation concern.
pub fn unread_count<S: KvStore>(
    store: &mut AckStore<S>,
    summaries: &[RegionSummary],
    now: DateTime<Utc>,
) -> usize {
    summaries
        .iter()
        .filter(|s| s.severity.is_active() && !store.is_acknowledged(s, now))
        .count()
}

/// Marks one region's current identity as read.
pub fn mark_read<S: KvStore>(
    store: &mut AckStore<S>,
    summary: &RegionSummary,
    now: DateTime<Utc>,
) {
    store.acknowledge(summary, now);
}

/// Marks every active-severity region as read in one batch.
pub fn mark_all_read<S: KvStore>(
    store: &mut AckStore<S>,
    summaries: &[RegionSummary],
    now: DateTime<Utc>,
) {
    store.acknowledge_all(summaries, now);
}
