//! Per-edge interval index
//!
//! An affiliation edge stores one admission and one demission instant per
//! employment year under the keys `{year}_admission` / `{year}_demission`.
//! `IntervalIndex` parses those attributes once, restricted to a year
//! range, and collects whatever it could not interpret instead of failing.

use super::day::EpochDay;
use super::IntervalError;
use crate::graph::{AttrMap, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ADMISSION: &str = "admission";
const DEMISSION: &str = "demission";
const WAGE: &str = "wage";

pub fn admission_key(year: i32) -> String {
    format!("{}_{}", year, ADMISSION)
}

pub fn demission_key(year: i32) -> String {
    format!("{}_{}", year, DEMISSION)
}

pub fn wage_key(year: i32) -> String {
    format!("{}_{}", year, WAGE)
}

/// Inclusive year range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Every year up to and including `max`
    pub fn up_to(max: i32) -> Self {
        Self { min: i32::MIN, max }
    }

    pub fn all() -> Self {
        Self {
            min: i32::MIN,
            max: i32::MAX,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.min <= year && year <= self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Admission and demission instants for one employer-year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearInterval {
    pub admission: EpochDay,
    pub demission: EpochDay,
}

impl YearInterval {
    pub fn new(admission: EpochDay, demission: EpochDay) -> Self {
        Self {
            admission,
            demission,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.demission >= self.admission
    }

    /// Days worked in this interval, both ends inclusive; zero if malformed
    pub fn days(&self) -> u64 {
        if self.is_valid() {
            inclusive_span(self.admission, self.demission)
        } else {
            0
        }
    }

    /// Days both intervals cover, both ends inclusive. Never negative;
    /// a malformed interval on either side contributes nothing.
    pub fn overlap_days(&self, other: &YearInterval) -> u64 {
        if !self.is_valid() || !other.is_valid() {
            return 0;
        }
        let start = self.admission.max(other.admission);
        let end = self.demission.min(other.demission);
        if end < start {
            return 0;
        }
        inclusive_span(start, end)
    }
}

/// Days from `start` to `end` inclusive, saturating at `u64::MAX`.
/// Requires `start <= end`.
fn inclusive_span(start: EpochDay, end: EpochDay) -> u64 {
    let span = i128::from(end.0) - i128::from(start.0) + 1;
    u64::try_from(span).unwrap_or(u64::MAX)
}

/// Yearly intervals of one worker/employer edge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalIndex {
    years: BTreeMap<i32, YearInterval>,
    issues: Vec<IntervalError>,
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the yearly instants out of an edge's attributes.
    ///
    /// Years outside `range` are ignored. Unparsable keys, non-integer
    /// instants and unpaired halves are skipped and reported in `issues`.
    /// Malformed intervals (demission before admission) are kept, since
    /// they contribute zero overlap anyway, and also reported.
    pub fn from_attrs(attrs: &AttrMap, range: YearRange) -> Self {
        let mut index = Self::new();
        let mut admissions: BTreeMap<i32, EpochDay> = BTreeMap::new();
        let mut demissions: BTreeMap<i32, EpochDay> = BTreeMap::new();

        for (key, value) in attrs {
            let Some((year_part, suffix)) = key.rsplit_once('_') else {
                continue;
            };
            let target = match suffix {
                ADMISSION => &mut admissions,
                DEMISSION => &mut demissions,
                _ => continue,
            };

            let year: i32 = match year_part.parse() {
                Ok(year) => year,
                Err(_) => {
                    index.issues.push(IntervalError::InconsistentData(format!(
                        "unparsable year in attribute '{}'",
                        key
                    )));
                    continue;
                }
            };
            if !range.contains(year) {
                continue;
            }

            match value {
                Value::Int(days) => {
                    target.insert(year, EpochDay(*days));
                }
                other => index.issues.push(IntervalError::InconsistentData(format!(
                    "attribute '{}' holds {} instead of an epoch day",
                    key,
                    other.type_name()
                ))),
            }
        }

        for (year, admission) in admissions {
            let Some(demission) = demissions.remove(&year) else {
                index.issues.push(IntervalError::InconsistentData(format!(
                    "year {} has an admission but no demission",
                    year
                )));
                continue;
            };
            let interval = YearInterval::new(admission, demission);
            if !interval.is_valid() {
                index.issues.push(IntervalError::InconsistentData(format!(
                    "year {}: demission {} before admission {}",
                    year, demission, admission
                )));
            }
            index.years.insert(year, interval);
        }
        for year in demissions.into_keys() {
            index.issues.push(IntervalError::InconsistentData(format!(
                "year {} has a demission but no admission",
                year
            )));
        }

        index
    }

    pub fn insert(&mut self, year: i32, interval: YearInterval) -> Option<YearInterval> {
        self.years.insert(year, interval)
    }

    pub fn get(&self, year: i32) -> Option<&YearInterval> {
        self.years.get(&year)
    }

    /// Years from latest to earliest
    pub fn iter_desc(&self) -> impl Iterator<Item = (i32, &YearInterval)> {
        self.years.iter().rev().map(|(y, i)| (*y, i))
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Data problems found while parsing
    pub fn issues(&self) -> &[IntervalError] {
        &self.issues
    }
}
