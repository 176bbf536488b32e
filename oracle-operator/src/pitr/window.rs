//! Recovery-window derivation (§4.4.4, §4.4.5): turns a flat set of shipped
//! [`LogEntry`] records into the `[begin, end)` SCN/time windows a PITR
//! instance can actually recover into, and answers point-in-time
//! recoverability and retention-safety queries against them.
//!
//! The algorithm in three passes, mirroring §4.4.4's description:
//! 1. Group entries by `thread`, and within a thread find maximal runs where
//!    each entry's `firstChange` equals the previous entry's `nextChange`
//!    (an unbroken sequence — no gap, no overlap).
//! 2. A recoverable window requires *every* thread to have overlapping
//!    coverage for the same SCN range — intersect the per-thread runs.
//! 3. Merge any windows that touch or overlap after intersection.

use crate::pitr::metadata_store::LogEntry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// An SCN/time range recoverable into, inclusive of `begin`, exclusive of
/// `end` for the purposes of [`is_recoverable`] (§4.4.5: "falls strictly
/// inside an existing window").
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    /// First recoverable SCN, inclusive.
    pub begin_change: u64,
    /// Last recoverable SCN, exclusive.
    pub end_change: u64,
    /// Wall-clock time corresponding to `begin_change`.
    pub begin_time: DateTime<Utc>,
    /// Wall-clock time corresponding to `end_change`.
    pub end_time: DateTime<Utc>,
}

/// A contiguous, gap-free run of log entries within a single thread.
struct Run {
    begin_change: u64,
    end_change: u64,
    begin_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

/// Splits one thread's entries (already sorted by `sequence`) into maximal
/// contiguous runs.
fn contiguous_runs(entries: &[&LogEntry]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut iter = entries.iter();
    let Some(first) = iter.next() else {
        return runs;
    };
    let mut current = Run {
        begin_change: first.first_change,
        end_change: first.next_change,
        begin_time: first.first_time,
        end_time: first.next_time,
    };
    for entry in iter {
        if entry.first_change == current.end_change {
            current.end_change = entry.next_change;
            current.end_time = entry.next_time;
        } else {
            runs.push(current);
            current = Run {
                begin_change: entry.first_change,
                end_change: entry.next_change,
                begin_time: entry.first_time,
                end_time: entry.next_time,
            };
        }
    }
    runs.push(current);
    runs
}

/// Intersects two sorted run lists on their SCN ranges, keeping only the
/// overlapping portions — used to require *all* threads to cover an SCN
/// range before it counts as recoverable.
fn intersect_runs(a: &[Run], b: &[Run]) -> Vec<Window> {
    let mut out = Vec::new();
    for ra in a {
        for rb in b {
            let begin_change = ra.begin_change.max(rb.begin_change);
            let end_change = ra.end_change.min(rb.end_change);
            if begin_change >= end_change {
                continue;
            }
            let begin_time = if ra.begin_change >= rb.begin_change {
                ra.begin_time
            } else {
                rb.begin_time
            };
            let end_time = if ra.end_change <= rb.end_change {
                ra.end_time
            } else {
                rb.end_time
            };
            out.push(Window {
                begin_change,
                end_change,
                begin_time,
                end_time,
            });
        }
    }
    out
}

/// Merges windows whose SCN ranges touch or overlap into a single window,
/// after sorting by `begin_change`.
fn merge_windows(mut windows: Vec<Window>) -> Vec<Window> {
    windows.sort_by_key(|w| w.begin_change);
    let mut merged: Vec<Window> = Vec::new();
    for w in windows {
        match merged.last_mut() {
            Some(last) if w.begin_change <= last.end_change => {
                if w.end_change > last.end_change {
                    last.end_change = w.end_change;
                    last.end_time = w.end_time;
                }
            }
            _ => merged.push(w),
        }
    }
    merged
}

/// Derives the recoverable windows for a full log catalogue (§4.4.4).
/// Partitions by incarnation first — recovery windows never cross an
/// incarnation boundary — then, within each incarnation, by thread; threads
/// are intersected on SCN before merging. A single thread within an
/// incarnation (the common case) degenerates to that thread's own
/// contiguous runs, since there is nothing to intersect against.
pub fn recovery_windows(entries: &[LogEntry]) -> Vec<Window> {
    let mut by_incarnation: BTreeMap<u32, Vec<&LogEntry>> = BTreeMap::new();
    for entry in entries {
        by_incarnation.entry(entry.incarnation).or_default().push(entry);
    }

    let mut windows = Vec::new();
    for incarnation_entries in by_incarnation.values() {
        windows.extend(recovery_windows_within_incarnation(incarnation_entries));
    }
    windows
}

fn recovery_windows_within_incarnation(entries: &[&LogEntry]) -> Vec<Window> {
    let mut by_thread: BTreeMap<u32, Vec<&LogEntry>> = BTreeMap::new();
    for entry in entries {
        by_thread.entry(entry.thread).or_default().push(entry);
    }
    for thread_entries in by_thread.values_mut() {
        thread_entries.sort_by_key(|e| e.sequence);
    }

    let mut runs_per_thread: Vec<Vec<Run>> = by_thread.values().map(|v| contiguous_runs(v)).collect();

    let Some(mut acc) = runs_per_thread.pop() else {
        return Vec::new();
    };
    let as_windows = |runs: Vec<Run>| -> Vec<Window> {
        runs.into_iter()
            .map(|r| Window {
                begin_change: r.begin_change,
                end_change: r.end_change,
                begin_time: r.begin_time,
                end_time: r.end_time,
            })
            .collect()
    };
    if runs_per_thread.is_empty() {
        return merge_windows(as_windows(acc.drain(..).collect()));
    }

    let mut windows: Vec<Window> = as_windows(acc.drain(..).collect());
    for runs in runs_per_thread {
        windows = intersect_runs(
            &windows
                .iter()
                .map(|w| Run {
                    begin_change: w.begin_change,
                    end_change: w.end_change,
                    begin_time: w.begin_time,
                    end_time: w.end_time,
                })
                .collect::<Vec<_>>(),
            &runs,
        );
    }
    merge_windows(windows)
}

/// Whether `at` falls strictly inside one of `windows` (§4.4.5).
pub fn is_recoverable(windows: &[Window], at: DateTime<Utc>) -> bool {
    windows.iter().any(|w| at > w.begin_time && at < w.end_time)
}

/// Whether removing `candidate` from `entries` would still leave the last
/// `retention` worth of history recoverable, i.e. a later same-thread entry
/// already covers the gap and the resulting windows still reach back to
/// `now - retention` (§4.4.3's deletion-safety check).
pub fn covers(entries: &[LogEntry], candidate: &LogEntry, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
    let has_later_same_thread = entries.iter().any(|e| {
        e.incarnation == candidate.incarnation
            && e.thread == candidate.thread
            && e.key != candidate.key
            && e.first_change >= candidate.next_change
    });
    if !has_later_same_thread {
        return false;
    }

    let without: Vec<LogEntry> = entries.iter().filter(|e| e.key != candidate.key).cloned().collect();
    let windows = recovery_windows(&without);
    let horizon = now - retention;
    windows.iter().any(|w| w.begin_time <= horizon && w.end_time >= now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(thread: u32, sequence: u64, first_change: u64, next_change: u64, first_secs: i64, next_secs: i64) -> LogEntry {
        entry_inc(1, thread, sequence, first_change, next_change, first_secs, next_secs)
    }

    fn entry_inc(
        incarnation: u32,
        thread: u32,
        sequence: u64,
        first_change: u64,
        next_change: u64,
        first_secs: i64,
        next_secs: i64,
    ) -> LogEntry {
        LogEntry {
            key: format!("i{incarnation}-t{thread}-s{sequence}"),
            thread,
            sequence,
            incarnation,
            first_change,
            next_change,
            first_time: Utc.timestamp_opt(first_secs, 0).unwrap(),
            next_time: Utc.timestamp_opt(next_secs, 0).unwrap(),
            size_bytes: 1024,
            object_path: format!("logs/i{incarnation}-t{thread}-s{sequence}"),
        }
    }

    /// Scenario D: two same-thread, SCN-contiguous entries merge into one
    /// window spanning both.
    #[test]
    fn contiguous_same_thread_entries_merge_into_one_window() {
        let entries = vec![entry(1, 1, 1000, 1030, 0, 30), entry(1, 2, 1030, 1060, 30, 60)];
        let windows = recovery_windows(&entries);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].begin_change, 1000);
        assert_eq!(windows[0].end_change, 1060);
        assert_eq!(windows[0].begin_time, Utc.timestamp_opt(0, 0).unwrap());
        assert_eq!(windows[0].end_time, Utc.timestamp_opt(60, 0).unwrap());
    }

    #[test]
    fn gap_in_single_thread_produces_two_windows() {
        let entries = vec![entry(1, 1, 1000, 1030, 0, 30), entry(1, 2, 1040, 1070, 40, 70)];
        let windows = recovery_windows(&entries);
        assert_eq!(windows.len(), 2);
    }

    #[test]
    fn multi_thread_recoverable_range_is_the_intersection() {
        let entries = vec![
            entry(1, 1, 1000, 1100, 0, 100),
            entry(2, 1, 1020, 1080, 10, 80),
        ];
        let windows = recovery_windows(&entries);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].begin_change, 1020);
        assert_eq!(windows[0].end_change, 1080);
    }

    /// Two incarnations sharing a thread number and overlapping SCN ranges
    /// must never be intersected or merged together — recovery windows
    /// never cross an incarnation boundary.
    #[test]
    fn windows_never_cross_incarnation_boundary() {
        let entries = vec![
            entry_inc(1, 1, 1, 1000, 1100, 0, 100),
            entry_inc(2, 1, 1, 1000, 1100, 200, 300),
        ];
        let windows = recovery_windows(&entries);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].begin_time, Utc.timestamp_opt(0, 0).unwrap());
        assert_eq!(windows[1].begin_time, Utc.timestamp_opt(200, 0).unwrap());
    }

    /// A later entry on the same thread number but a different incarnation
    /// must not count as covering a candidate for deletion.
    #[test]
    fn covers_does_not_cross_incarnation_boundary() {
        let now = Utc.timestamp_opt(1000, 0).unwrap();
        let retention = chrono::Duration::seconds(200);
        let candidate = entry_inc(1, 1, 1, 1000, 1030, 0, 30);
        let other_incarnation_later = entry_inc(2, 1, 2, 1030, 1060, 900, 1000);
        let entries = vec![candidate.clone(), other_incarnation_later];
        assert!(!covers(&entries, &candidate, now, retention));
    }

    #[test]
    fn point_strictly_inside_window_is_recoverable() {
        let windows = vec![Window {
            begin_change: 1000,
            end_change: 2000,
            begin_time: Utc.timestamp_opt(0, 0).unwrap(),
            end_time: Utc.timestamp_opt(100, 0).unwrap(),
        }];
        assert!(is_recoverable(&windows, Utc.timestamp_opt(50, 0).unwrap()));
        assert!(!is_recoverable(&windows, Utc.timestamp_opt(0, 0).unwrap()));
        assert!(!is_recoverable(&windows, Utc.timestamp_opt(100, 0).unwrap()));
        assert!(!is_recoverable(&windows, Utc.timestamp_opt(150, 0).unwrap()));
    }

    #[test]
    fn covers_requires_later_entry_and_retained_horizon() {
        let now = Utc.timestamp_opt(300, 0).unwrap();
        let retention = chrono::Duration::seconds(200);
        let e1 = entry(1, 1, 1000, 1030, 0, 30);
        let e2 = entry(1, 2, 1030, 1060, 30, 300);
        let entries = vec![e1.clone(), e2];
        assert!(covers(&entries, &e1, now, retention));

        let lone = vec![e1.clone()];
        assert!(!covers(&lone, &e1, now, retention));
    }
}
