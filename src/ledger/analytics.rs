//! Popularity rankings and peak load over ledger snapshots.
//!
//! All functions are pure: they read a [`LedgerSnapshot`] and recompute
//! from scratch on every call. None of them fail; an empty ledger yields an
//! empty ranking or a peak load of zero.
//!
//! # Ranking order
//!
//! Keys are ordered by request count, highest first. Keys with equal
//! counts keep their first-seen order. Rankings are truncated to exactly
//! the requested number of items.

use std::cmp::Reverse;

use super::LedgerSnapshot;
use crate::clock::Millis;

/// Window used by the peak-load operation when the caller gives none.
pub const DEFAULT_PEAK_WINDOW_SECS: u64 = 30;

const MILLIS_PER_SEC: u64 = 1_000;

/// All-time ranking of query keys, most requested first.
pub fn zeitgeist(snapshot: &LedgerSnapshot, limit: usize) -> Vec<String> {
    rank(
        snapshot
            .keys
            .iter()
            .map(|history| (history.key.as_str(), history.timestamps.len())),
        limit,
    )
}

/// Ranking restricted to requests made within `window_secs` of `now`.
///
/// A request at `t` counts when `now - t <= window_secs * 1000`. Every key
/// takes part; keys with no request inside the window rank last, in
/// first-seen order.
pub fn trending(
    snapshot: &LedgerSnapshot,
    now: Millis,
    window_secs: u64,
    max_items: usize,
) -> Vec<String> {
    let window = window_secs.saturating_mul(MILLIS_PER_SEC);
    rank(
        snapshot
            .keys
            .iter()
            .map(|history| {
                let recent = history
                    .timestamps
                    .iter()
                    .filter(|&&t| now.saturating_sub(t) <= window)
                    .count();
                (history.key.as_str(), recent)
            }),
        max_items,
    )
}

/// Largest number of timestamps inside any closed span of `window_secs`.
///
/// `timestamps` need not be sorted. Two timestamps exactly `window_secs`
/// apart fall in the same span.
pub fn windowed_peak_load(timestamps: &[Millis], window_secs: u64) -> usize {
    let window = window_secs.saturating_mul(MILLIS_PER_SEC);
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let mut peak = 0;
    let mut right = 0;
    for left in 0..sorted.len() {
        if right < left {
            right = left;
        }
        while right < sorted.len() && sorted[right] - sorted[left] <= window {
            right += 1;
        }
        peak = peak.max(right - left);
    }
    peak
}

// Stable sort on descending count keeps first-seen order among ties: each
// key lands just before the first key with a strictly smaller count.
fn rank<'a>(counts: impl Iterator<Item = (&'a str, usize)>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(&str, usize)> = counts.collect();
    ranked.sort_by_key(|&(_, count)| Reverse(count));
    ranked
        .into_iter()
        .take(limit)
        .map(|(key, _)| key.to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::KeyHistory;

    fn snapshot(entries: Vec<(&str, Vec<Millis>)>) -> LedgerSnapshot {
        let keys: Vec<KeyHistory> = entries
            .into_iter()
            .map(|(key, timestamps)| KeyHistory {
                key: key.to_string(),
                timestamps,
            })
            .collect();
        let mut all: Vec<Millis> = keys.iter().flat_map(|h| h.timestamps.clone()).collect();
        all.sort_unstable();
        LedgerSnapshot {
            all_timestamps: all,
            keys,
        }
    }

    #[test]
    fn zeitgeist_orders_by_count() {
        let snap = snapshot(vec![
            ("A", vec![1, 2, 3]),
            ("B", vec![1, 2, 3, 4, 5]),
            ("C", vec![1]),
        ]);
        assert_eq!(zeitgeist(&snap, 2), vec!["B", "A"]);
        assert_eq!(zeitgeist(&snap, 3), vec!["B", "A", "C"]);
    }

    #[test]
    fn zeitgeist_ties_keep_first_seen_order() {
        let snap = snapshot(vec![
            ("late", vec![1]),
            ("x", vec![2, 3]),
            ("early", vec![4]),
            ("y", vec![5, 6]),
        ]);
        assert_eq!(zeitgeist(&snap, 10), vec!["x", "y", "late", "early"]);
    }

    #[test]
    fn limit_larger_than_keys_returns_all() {
        let snap = snapshot(vec![("A", vec![1]), ("B", vec![2])]);
        assert_eq!(zeitgeist(&snap, 50).len(), 2);
        assert!(zeitgeist(&snap, 0).is_empty());
    }

    #[test]
    fn empty_ledger_yields_empty_results() {
        let snap = LedgerSnapshot::default();
        assert!(zeitgeist(&snap, 5).is_empty());
        assert!(trending(&snap, 1_000, 10, 5).is_empty());
        assert_eq!(windowed_peak_load(&snap.all_timestamps, 30), 0);
    }

    #[test]
    fn trending_counts_only_recent_requests() {
        // At now=10_000 with a 5s window, only t >= 5_000 counts.
        let snap = snapshot(vec![
            ("old", vec![100, 200, 300, 400]),
            ("new", vec![9_000, 9_500]),
            ("edge", vec![5_000]),
        ]);
        assert_eq!(trending(&snap, 10_000, 5, 10), vec!["new", "edge", "old"]);
        assert_eq!(trending(&snap, 10_000, 5, 1), vec!["new"]);
        assert_eq!(trending(&snap, 10_000, 60, 1), vec!["old"]);
    }

    #[test]
    fn trending_keeps_quiet_keys_in_first_seen_order() {
        let snap = snapshot(vec![
            ("first", vec![10]),
            ("hot", vec![50_000]),
            ("second", vec![20, 30]),
        ]);
        assert_eq!(
            trending(&snap, 50_000, 1, 3),
            vec!["hot", "first", "second"]
        );
    }

    #[test]
    fn peak_load_closed_window() {
        let times = [0, 1_000, 1_100, 2_000, 5_000];
        assert_eq!(windowed_peak_load(&times, 1), 3);
        assert_eq!(windowed_peak_load(&times, 5), 5);
        assert_eq!(windowed_peak_load(&times, 0), 1);
    }

    #[test]
    fn peak_load_unsorted_input_and_duplicates() {
        let times = [2_000, 0, 2_000, 1_000, 2_000];
        assert_eq!(windowed_peak_load(&times, 0), 3);
        assert_eq!(windowed_peak_load(&times, 1), 4);
    }
}
