//! Recurrence rule value types (RFC 5545 §3.3.10, §3.8.5.3).

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Recurrence frequency (RFC 5545 §3.3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency token. Tokens are uppercase and case-sensitive.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "SECONDLY" => Self::Secondly,
            "MINUTELY" => Self::Minutely,
            "HOURLY" => Self::Hourly,
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "MONTHLY" => Self::Monthly,
            "YEARLY" => Self::Yearly,
            _ => return None,
        })
    }

    /// True for the sub-daily frequencies, where BYHOUR/BYMINUTE/BYSECOND
    /// restrict the stepped instant instead of fanning it out.
    #[must_use]
    pub const fn is_sub_daily(self) -> bool {
        matches!(self, Self::Secondly | Self::Minutely | Self::Hourly)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Returns the two-letter abbreviation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }

    /// Parses a two-letter weekday code. Codes are uppercase and
    /// case-sensitive.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "SU" => Self::Sunday,
            "MO" => Self::Monday,
            "TU" => Self::Tuesday,
            "WE" => Self::Wednesday,
            "TH" => Self::Thursday,
            "FR" => Self::Friday,
            "SA" => Self::Saturday,
            _ => return None,
        })
    }

    /// Returns all weekdays in order (Sunday through Saturday).
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Sunday,
            Self::Monday,
            Self::Tuesday,
            Self::Wednesday,
            Self::Thursday,
            Self::Friday,
            Self::Saturday,
        ]
    }

    const fn index(self) -> u32 {
        match self {
            Self::Sunday => 0,
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
        }
    }

    /// Number of days from `start` forward to `self` (0..=6).
    ///
    /// Used to place a weekday inside a week window that begins on `start`.
    #[must_use]
    pub const fn days_from(self, start: Self) -> u32 {
        (self.index() + 7 - start.index()) % 7
    }

    /// Converts from a chrono weekday.
    #[must_use]
    pub const fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }

    /// Converts to a chrono weekday.
    #[must_use]
    pub const fn to_chrono(self) -> chrono::Weekday {
        match self {
            Self::Monday => chrono::Weekday::Mon,
            Self::Tuesday => chrono::Weekday::Tue,
            Self::Wednesday => chrono::Weekday::Wed,
            Self::Thursday => chrono::Weekday::Thu,
            Self::Friday => chrono::Weekday::Fri,
            Self::Saturday => chrono::Weekday::Sat,
            Self::Sunday => chrono::Weekday::Sun,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weekday with optional occurrence number.
///
/// Used in the BYDAY rule part. Examples:
/// - `MO` - every Monday
/// - `1MO` - first Monday of the month/year
/// - `-1FR` - last Friday of the month/year
///
/// The ordinal magnitude is unbounded at parse time; expansion clamps it to
/// the frequency window (an ordinal past the window selects nothing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayNum {
    /// Optional signed, non-zero occurrence number.
    pub ordinal: Option<i32>,
    /// The day of the week.
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Creates a weekday occurrence without an ordinal.
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    /// Creates a weekday occurrence with an ordinal.
    ///
    /// ## Panics
    ///
    /// Panics if ordinal is 0.
    #[must_use]
    pub fn nth(ordinal: i32, weekday: Weekday) -> Self {
        assert!(ordinal != 0);
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

/// UNTIL value - either a bare date or a UTC date-time.
///
/// Both are inclusive upper bounds on occurrence start instants. A bare date
/// resolves to local midnight in the anchor's timezone at expansion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Until {
    /// Date-only boundary (`YYYYMMDD`).
    Date(NaiveDate),
    /// UTC date-time boundary (`YYYYMMDDTHHMMSSZ`).
    DateTime(DateTime<Utc>),
}

impl fmt::Display for Until {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{}", d.format("%Y%m%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y%m%dT%H%M%SZ")),
        }
    }
}

/// A validated recurrence rule.
///
/// Produced by [`crate::parse`] and never mutated afterwards; expansion is a
/// pure function of a rule and an anchor. All fields are public so callers
/// and tests can inspect exactly what was parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurRule {
    /// Recurrence frequency (required, appears exactly once).
    pub frequency: Frequency,

    /// Recurrence interval in units of `frequency` (>= 1, default 1).
    pub interval: u32,

    /// Number of period windows to expand (mutually exclusive with `until`).
    pub count: Option<u32>,

    /// Inclusive end bound of the recurrence (mutually exclusive with
    /// `count`).
    pub until: Option<Until>,

    /// First day of the week for weekly window computation (WKST, default
    /// Monday).
    pub week_start: Weekday,

    /// By-second list (0-60, 60 admitted for a leap second).
    pub by_second: Vec<u8>,

    /// By-minute list (0-59).
    pub by_minute: Vec<u8>,

    /// By-hour list (0-23).
    pub by_hour: Vec<u8>,

    /// By-day list with optional occurrence numbers.
    pub by_day: Vec<WeekdayNum>,

    /// By-monthday list (-31 to 31, excluding 0).
    pub by_month_day: Vec<i8>,

    /// By-yearday list (-366 to 366, excluding 0).
    pub by_year_day: Vec<i16>,

    /// By-weekno list (-53 to 53, excluding 0).
    pub by_week_no: Vec<i8>,

    /// By-month list (1-12).
    pub by_month: Vec<u8>,

    /// By-setpos list (-366 to 366, excluding 0). Selects positions out of
    /// each period's candidate set; requires at least one other BY* part.
    pub by_set_pos: Vec<i16>,
}

impl RecurRule {
    /// Creates a rule with the given frequency and all defaults.
    #[must_use]
    pub const fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            week_start: Weekday::Monday,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_no: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
        }
    }

    /// Creates a daily recurrence rule.
    #[must_use]
    pub const fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    /// Creates a weekly recurrence rule.
    #[must_use]
    pub const fn weekly() -> Self {
        Self::new(Frequency::Weekly)
    }

    /// Creates a monthly recurrence rule.
    #[must_use]
    pub const fn monthly() -> Self {
        Self::new(Frequency::Monthly)
    }

    /// Creates a yearly recurrence rule.
    #[must_use]
    pub const fn yearly() -> Self {
        Self::new(Frequency::Yearly)
    }

    /// Sets the interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self.until = None; // Mutually exclusive
        self
    }

    /// Sets the until date.
    #[must_use]
    pub fn with_until_date(mut self, date: NaiveDate) -> Self {
        self.until = Some(Until::Date(date));
        self.count = None; // Mutually exclusive
        self
    }

    /// Sets the until date-time.
    #[must_use]
    pub fn with_until_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.until = Some(Until::DateTime(datetime));
        self.count = None; // Mutually exclusive
        self
    }

    /// Sets the by-day list.
    #[must_use]
    pub fn with_by_day(mut self, days: Vec<WeekdayNum>) -> Self {
        self.by_day = days;
        self
    }

    /// Sets the by-month list.
    #[must_use]
    pub fn with_by_month(mut self, months: Vec<u8>) -> Self {
        self.by_month = months;
        self
    }

    /// Sets the by-monthday list.
    #[must_use]
    pub fn with_by_month_day(mut self, days: Vec<i8>) -> Self {
        self.by_month_day = days;
        self
    }

    /// Sets the by-setpos list.
    #[must_use]
    pub fn with_by_set_pos(mut self, positions: Vec<i16>) -> Self {
        self.by_set_pos = positions;
        self
    }

    /// Sets the week start day.
    #[must_use]
    pub const fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// True if any BY* part is present.
    #[must_use]
    pub fn has_by_part(&self) -> bool {
        !self.by_second.is_empty()
            || !self.by_minute.is_empty()
            || !self.by_hour.is_empty()
            || !self.by_day.is_empty()
            || !self.by_month_day.is_empty()
            || !self.by_year_day.is_empty()
            || !self.by_week_no.is_empty()
            || !self.by_month.is_empty()
    }
}

impl fmt::Display for RecurRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: ToString>(values: &[T]) -> String {
            let s: Vec<_> = values.iter().map(ToString::to_string).collect();
            s.join(",")
        }

        let mut parts = vec![format!("FREQ={}", self.frequency)];

        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }

        if let Some(ref until) = self.until {
            parts.push(format!("UNTIL={until}"));
        }

        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }

        if self.week_start != Weekday::Monday {
            parts.push(format!("WKST={}", self.week_start));
        }

        if !self.by_second.is_empty() {
            parts.push(format!("BYSECOND={}", list(&self.by_second)));
        }

        if !self.by_minute.is_empty() {
            parts.push(format!("BYMINUTE={}", list(&self.by_minute)));
        }

        if !self.by_hour.is_empty() {
            parts.push(format!("BYHOUR={}", list(&self.by_hour)));
        }

        if !self.by_day.is_empty() {
            parts.push(format!("BYDAY={}", list(&self.by_day)));
        }

        if !self.by_month_day.is_empty() {
            parts.push(format!("BYMONTHDAY={}", list(&self.by_month_day)));
        }

        if !self.by_year_day.is_empty() {
            parts.push(format!("BYYEARDAY={}", list(&self.by_year_day)));
        }

        if !self.by_week_no.is_empty() {
            parts.push(format!("BYWEEKNO={}", list(&self.by_week_no)));
        }

        if !self.by_month.is_empty() {
            parts.push(format!("BYMONTH={}", list(&self.by_month)));
        }

        if !self.by_set_pos.is_empty() {
            parts.push(format!("BYSETPOS={}", list(&self.by_set_pos)));
        }

        write!(f, "{}", parts.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_display_basic() {
        let rule = RecurRule::daily().with_count(10);
        assert_eq!(rule.to_string(), "FREQ=DAILY;COUNT=10");
    }

    #[test]
    fn rule_display_weekly_byday() {
        let rule = RecurRule::weekly().with_by_day(vec![
            WeekdayNum::every(Weekday::Monday),
            WeekdayNum::every(Weekday::Wednesday),
            WeekdayNum::every(Weekday::Friday),
        ]);
        assert_eq!(rule.to_string(), "FREQ=WEEKLY;BYDAY=MO,WE,FR");
    }

    #[test]
    fn rule_display_monthly_nth() {
        let rule = RecurRule::monthly().with_by_day(vec![WeekdayNum::nth(-1, Weekday::Friday)]);
        assert_eq!(rule.to_string(), "FREQ=MONTHLY;BYDAY=-1FR");
    }

    #[test]
    fn rule_display_with_interval_and_wkst() {
        let rule = RecurRule::weekly()
            .with_interval(2)
            .with_week_start(Weekday::Sunday);
        assert_eq!(rule.to_string(), "FREQ=WEEKLY;INTERVAL=2;WKST=SU");
    }

    #[test]
    fn rule_display_until_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let rule = RecurRule::daily().with_until_date(date);
        assert_eq!(rule.to_string(), "FREQ=DAILY;UNTIL=20260301");
    }

    #[test]
    fn weekday_parse_is_case_sensitive() {
        assert_eq!(Weekday::parse("MO"), Some(Weekday::Monday));
        assert_eq!(Weekday::parse("fr"), None);
        assert_eq!(Weekday::parse("XX"), None);
    }

    #[test]
    fn frequency_parse_is_case_sensitive() {
        assert_eq!(Frequency::parse("DAILY"), Some(Frequency::Daily));
        assert_eq!(Frequency::parse("weekly"), None);
        assert_eq!(Frequency::parse("RANDOMLY"), None);
    }

    #[test]
    fn weekday_round_trips() {
        for weekday in Weekday::all() {
            assert_eq!(Weekday::parse(weekday.as_str()), Some(weekday));
            assert_eq!(Weekday::from_chrono(weekday.to_chrono()), weekday);
        }
    }

    #[test]
    fn weekday_days_from_week_start() {
        assert_eq!(Weekday::Monday.days_from(Weekday::Monday), 0);
        assert_eq!(Weekday::Sunday.days_from(Weekday::Monday), 6);
        assert_eq!(Weekday::Wednesday.days_from(Weekday::Sunday), 3);
    }
}
