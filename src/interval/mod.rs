//! Employment intervals and temporal overlap
//!
//! - `day`: canonical instant unit (days since epoch) and boundary conversions
//! - `index`: per-edge view of yearly admission/demission instants
//! - `overlap`: overlapping-days evaluation with threshold early exit

pub mod day;
pub mod index;
pub mod overlap;

pub use day::EpochDay;
pub use index::{admission_key, demission_key, wage_key, IntervalIndex, YearInterval, YearRange};
pub use overlap::{OverlapEvaluator, Threshold};

use thiserror::Error;

/// Interval errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntervalError {
    /// Malformed instant or interval: demission before admission,
    /// unparsable year, impossible calendar date
    #[error("Inconsistent data: {0}")]
    InconsistentData(String),
}

pub type IntervalResult<T> = Result<T, IntervalError>;
