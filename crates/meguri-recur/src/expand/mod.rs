//! Occurrence expansion for validated recurrence rules.
//!
//! Expansion is a pure function of a rule, an anchor occurrence, and a
//! reference instant for the unbounded-series horizon. The caller supplies
//! the reference instant explicitly so results are reproducible.

mod calendar;
mod expander;

pub use expander::Expander;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

/// How many years an open-ended series (neither COUNT nor UNTIL) is expanded
/// past the reference instant.
pub const DEFAULT_HORIZON_YEARS: u32 = 10;

/// The anchor occurrence a recurring series grows from.
///
/// Owned by the caller; expansion only reads it. The start's timezone is the
/// local context for all date and weekday computation, and the duration is
/// carried for the caller's event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Start of the first occurrence, with its local-timezone context.
    pub start: DateTime<Tz>,
    /// Duration of each occurrence.
    pub duration: Duration,
}

impl Anchor {
    /// Creates an anchor occurrence.
    #[must_use]
    pub const fn new(start: DateTime<Tz>, duration: Duration) -> Self {
        Self { start, duration }
    }

    /// The anchor's start as a UTC instant.
    #[must_use]
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }
}

/// Expansion tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Horizon, in years past the reference instant, bounding rules with
    /// neither COUNT nor UNTIL.
    pub horizon_years: u32,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            horizon_years: DEFAULT_HORIZON_YEARS,
        }
    }
}

impl ExpandOptions {
    /// Creates options with the given horizon.
    #[must_use]
    pub const fn with_horizon_years(horizon_years: u32) -> Self {
        Self { horizon_years }
    }
}
