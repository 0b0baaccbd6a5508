//! Canonical instant representation
//!
//! Every admission/demission instant is stored as a whole number of days
//! since 1970-01-01. Conversions from POSIX seconds and from calendar dates
//! happen here and nowhere else.

use super::{IntervalError, IntervalResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Days since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpochDay(pub i64);

impl EpochDay {
    pub fn new(days: i64) -> Self {
        EpochDay(days)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Convert POSIX seconds, rounding to the nearest day.
    ///
    /// Timestamps taken at local midnight sit a few hours off a UTC day
    /// boundary; rounding keeps every such instant on its own calendar day.
    pub fn from_timestamp(seconds: i64) -> Self {
        let days = seconds.div_euclid(SECONDS_PER_DAY);
        let rem = seconds.rem_euclid(SECONDS_PER_DAY);
        if rem * 2 >= SECONDS_PER_DAY {
            EpochDay(days + 1)
        } else {
            EpochDay(days)
        }
    }

    /// Convert fractional POSIX seconds
    pub fn from_timestamp_f64(seconds: f64) -> IntervalResult<Self> {
        if !seconds.is_finite() {
            return Err(IntervalError::InconsistentData(format!(
                "timestamp {} is not a finite number",
                seconds
            )));
        }
        Ok(EpochDay((seconds / SECONDS_PER_DAY as f64).round() as i64))
    }

    /// Convert a calendar date. Impossible dates such as February 30 are
    /// rejected rather than clamped.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> IntervalResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self::from_date)
            .ok_or_else(|| {
                IntervalError::InconsistentData(format!(
                    "{:04}-{:02}-{:02} is not a calendar date",
                    year, month, day
                ))
            })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        EpochDay(date.signed_duration_since(epoch()).num_days())
    }

    pub fn to_date(&self) -> Option<NaiveDate> {
        epoch().checked_add_signed(chrono::Duration::try_days(self.0)?)
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

impl fmt::Display for EpochDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_date() {
            Some(date) => write!(f, "{}", date),
            None => write!(f, "day {}", self.0),
        }
    }
}

impl From<NaiveDate> for EpochDay {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}
