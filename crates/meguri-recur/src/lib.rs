//! Recurrence-rule interpretation: parsing, validation, and occurrence
//! expansion for iCalendar-style RRULE text (RFC 5545 §3.3.10).
//!
//! The interpreter has two halves. [`parse`] turns `KEY=VALUE;…` recurrence
//! text into a validated, immutable [`RecurRule`], rejecting anything outside
//! each component's legal domain. [`Expander`] then turns a rule plus an
//! [`Anchor`] occurrence into the ordered sequence of occurrence start
//! instants, applying frequency stepping, BY* filtering, BYSETPOS selection,
//! and the COUNT/UNTIL/horizon termination policy.
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use meguri_recur::{Anchor, RecurRule, parse};
//!
//! let rule: RecurRule = parse("FREQ=DAILY;COUNT=3")?;
//! let start = chrono_tz::UTC.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
//! let anchor = Anchor::new(start, Duration::hours(1));
//! let now = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
//!
//! let occurrences = rule.expand(&anchor, now);
//! assert_eq!(occurrences.len(), 3);
//! assert_eq!(occurrences[0], anchor.start_utc());
//! # Ok::<(), meguri_recur::RuleError>(())
//! ```
//!
//! Expansion is a pure function of its inputs: no clock reads, no I/O, no
//! shared state. Rules and anchors can be expanded from any thread.

pub mod core;
pub mod expand;
pub mod parse;

pub use crate::core::{Component, Frequency, RecurRule, Until, Weekday, WeekdayNum};
pub use crate::expand::{Anchor, DEFAULT_HORIZON_YEARS, ExpandOptions, Expander};
pub use crate::parse::{RuleError, RuleResult, parse};
