//! Closed-open minute intervals and the pure algebra over them.
//!
//! All reconciliation arithmetic happens here, on whole minutes since
//! midnight compared as integers. No rounding is applied anywhere; buffer
//! expansion is exact addition and subtraction of minutes. The functions in
//! this module are side-effect-free; the engine decides what to do with the
//! results.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::policy::MidnightPolicy;

/// First minute of the day.
pub const DAY_START: i32 = 0;
/// One-past-the-last minute of the day (24:00).
pub const DAY_END: i32 = 24 * 60;

/// A closed-open time range `[start, end)` on a single date, in whole
/// minutes since midnight. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    start: i32,
    end: i32,
}

impl Interval {
    /// Build an interval from raw minute offsets.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidInterval`] when `start >= end`.
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build an interval from time-of-day bounds. Seconds are truncated;
    /// the engine works in whole minutes.
    pub fn from_times(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        Self::new(
            (start.num_seconds_from_midnight() / 60) as i32,
            (end.num_seconds_from_midnight() / 60) as i32,
        )
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn duration_minutes(&self) -> i32 {
        self.end - self.start
    }

    /// Convert back to time-of-day bounds. `None` when a bound cannot be
    /// represented as a `NaiveTime` (i.e. at or past 24:00); fragment
    /// material always originates from time-of-day bounds, so this only
    /// fails on intervals built from raw out-of-day minutes.
    pub fn times(&self) -> Option<(NaiveTime, NaiveTime)> {
        let start = NaiveTime::from_num_seconds_from_midnight_opt(self.start as u32 * 60, 0)?;
        let end = NaiveTime::from_num_seconds_from_midnight_opt(self.end as u32 * 60, 0)?;
        Some((start, end))
    }

    /// Two intervals overlap iff `a.start < b.end && b.start < a.end`.
    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Overlapping, or touching end-to-start. This is the mergeability test.
    pub fn touches_or_overlaps(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Expand an interval by `margin` minutes on both sides.
///
/// Under [`MidnightPolicy::Clamp`] the result is truncated to
/// `[00:00, 24:00)`; under [`MidnightPolicy::Reject`] a window that would
/// cross either day boundary is refused.
///
/// # Errors
/// Returns [`EngineError::BufferOverflow`] under `Reject` when the expanded
/// window leaves the day.
pub fn expand(interval: Interval, margin: i32, policy: MidnightPolicy) -> Result<Interval> {
    let start = interval.start - margin;
    let end = interval.end + margin;
    match policy {
        MidnightPolicy::Clamp => Ok(Interval {
            start: start.max(DAY_START),
            end: end.min(DAY_END),
        }),
        MidnightPolicy::Reject => {
            if start < DAY_START || end > DAY_END {
                return Err(EngineError::BufferOverflow { start, end });
            }
            Ok(Interval { start, end })
        }
    }
}

/// Merge intervals on the same date into the minimal disjoint cover.
///
/// Any pair where `a.end >= b.start` is merged; touching counts as
/// mergeable. Ties in start time are broken by longer interval first, and
/// the result is independent of input order.
pub fn merge(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|iv| (iv.start, std::cmp::Reverse(iv.end)));

    let mut merged: Vec<Interval> = Vec::new();
    for iv in sorted {
        if let Some(last) = merged.last_mut() {
            if iv.start <= last.end {
                last.end = last.end.max(iv.end);
                continue;
            }
        }
        merged.push(iv);
    }
    merged
}

/// Subtract `busy` from `base`, returning the maximal sub-intervals of
/// `base` not covered by any busy interval, ordered ascending by start.
///
/// Busy intervals may overlap each other; they are merged internally before
/// subtraction. Zero-length remainders are discarded. Returns an empty list
/// when `busy` fully covers `base`.
pub fn subtract(base: Interval, busy: &[Interval]) -> Vec<Interval> {
    // Clip busy intervals to the base, discarding ones entirely outside.
    let clipped: Vec<Interval> = busy
        .iter()
        .filter(|b| b.start < base.end && b.end > base.start)
        .map(|b| Interval {
            start: b.start.max(base.start),
            end: b.end.min(base.end),
        })
        .collect();

    let covered = merge(&clipped);

    // Sweep a cursor across the base; the gaps between covered spans remain.
    let mut free = Vec::new();
    let mut cursor = base.start;
    for span in &covered {
        if cursor < span.start {
            free.push(Interval {
                start: cursor,
                end: span.start,
            });
        }
        cursor = cursor.max(span.end);
    }
    if cursor < base.end {
        free.push(Interval {
            start: cursor,
            end: base.end,
        });
    }
    free
}
