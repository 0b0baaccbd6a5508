//! Overlapping-days evaluation between two interval indexes

use super::index::IntervalIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum overlap required to connect two workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Threshold {
    /// Any shared employer qualifies, even with zero overlapping days
    Any,
    /// At least this many overlapping days
    MinDays(u64),
}

impl Threshold {
    /// Map the external `min_days_together` convention: `-1` is `Any`,
    /// non-negative values are day counts, anything else is invalid.
    pub fn from_min_days(min_days_together: i64) -> Option<Self> {
        match min_days_together {
            -1 => Some(Threshold::Any),
            n if n >= 0 => Some(Threshold::MinDays(n as u64)),
            _ => None,
        }
    }

    pub fn as_min_days(&self) -> i64 {
        match self {
            Threshold::Any => -1,
            Threshold::MinDays(n) => *n as i64,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Threshold::Any)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Any => write!(f, "any"),
            Threshold::MinDays(n) => write!(f, ">= {} days", n),
        }
    }
}

/// Computes overlapping days between two workers' intervals at one employer
#[derive(Debug, Clone, Copy)]
pub struct OverlapEvaluator {
    threshold: Threshold,
}

impl OverlapEvaluator {
    pub fn new(threshold: Threshold) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Sum of per-year overlaps over the years both indexes contain.
    ///
    /// Years are scanned latest first. With a day threshold the scan stops
    /// as soon as the running sum exceeds it, so the result is then a lower
    /// bound that is already past the threshold. In `Any` mode the scan
    /// always runs to completion.
    pub fn overlap_days(&self, a: &IntervalIndex, b: &IntervalIndex) -> u64 {
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        let mut total = 0u64;

        for (year, interval) in short.iter_desc() {
            let Some(other) = long.get(year) else {
                continue;
            };
            total = total.saturating_add(interval.overlap_days(other));

            if let Threshold::MinDays(min) = self.threshold {
                if total > min {
                    return total;
                }
            }
        }
        total
    }

    /// Exact sum without early exit
    pub fn total_overlap_days(a: &IntervalIndex, b: &IntervalIndex) -> u64 {
        Self::new(Threshold::Any).overlap_days(a, b)
    }

    /// Whether a pair with these intervals should be connected
    pub fn qualifies(&self, a: &IntervalIndex, b: &IntervalIndex) -> bool {
        match self.threshold {
            Threshold::Any => true,
            Threshold::MinDays(min) => self.overlap_days(a, b) >= min,
        }
    }
}
