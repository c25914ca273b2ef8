//! Recurrence expansion algorithm.
//!
//! Expansion walks period windows (one per `interval` units of the rule's
//! frequency), generates the candidate instants each window implies, filters
//! them through the BY* parts and BYSETPOS, and emits the survivors in
//! strictly increasing order until a termination bound is hit.

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Utc,
};
use chrono_tz::Tz;

use super::{Anchor, ExpandOptions, calendar};
use crate::core::{Frequency, RecurRule, Until, Weekday};

/// Safety valve on period iteration.
///
/// Prevents a COUNT rule whose filters can never match (e.g.
/// `BYMONTH=2;BYMONTHDAY=30`) from stepping forever.
const MAX_PERIODS: usize = 100_000;

/// Expands a validated rule into occurrence start instants.
pub struct Expander<'r> {
    rule: &'r RecurRule,
    options: ExpandOptions,
}

impl<'r> Expander<'r> {
    /// Creates an expander with default options.
    #[must_use]
    pub fn new(rule: &'r RecurRule) -> Self {
        Self::with_options(rule, ExpandOptions::default())
    }

    /// Creates an expander with explicit options.
    #[must_use]
    pub const fn with_options(rule: &'r RecurRule, options: ExpandOptions) -> Self {
        Self { rule, options }
    }

    /// Expands the rule against an anchor occurrence.
    ///
    /// `now` is the reference instant for the unbounded-series horizon; it is
    /// a parameter rather than a clock read so identical inputs always yield
    /// identical sequences. The anchor's start is always the first element,
    /// the result is strictly increasing, and duplicates are emitted once.
    #[must_use]
    pub fn occurrences(&self, anchor: &Anchor, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let rule = self.rule;
        let tz = anchor.start.timezone();
        let anchor_utc = anchor.start_utc();
        let anchor_local = anchor.start.naive_local();
        let anchor_date = anchor_local.date();

        let mut occurrences = vec![anchor_utc];
        if rule.count == Some(0) {
            return occurrences;
        }

        // COUNT rules are bounded by the period counter below; everything
        // else stops at UNTIL or at the horizon.
        let bound_utc = match rule.count {
            Some(_) => None,
            None => Some(
                self.until_instant(tz)
                    .unwrap_or_else(|| horizon_instant(now, self.options.horizon_years)),
            ),
        };
        let bound_local = bound_utc.map(|bound| bound.with_timezone(&tz).naive_local());

        let times = if rule.frequency.is_sub_daily() {
            Vec::new()
        } else {
            self.expanded_times(anchor_local.time())
        };

        let count_limit = rule
            .count
            .map(|count| usize::try_from(count).unwrap_or(usize::MAX));
        let mut productive_periods = 0_usize;
        let mut last = anchor_utc;
        let mut period = Period::containing(anchor_local, rule);

        for step in 0..MAX_PERIODS {
            if let Some(limit) = count_limit
                && productive_periods >= limit
            {
                break;
            }
            let Some(base) = period.base_local(rule.frequency) else {
                break;
            };
            if let Some(bound) = bound_local
                && base > bound
            {
                break;
            }

            let mut emitted = false;
            for candidate in self.period_candidates(period, anchor_date, &times) {
                let Some(instant) = to_instant(tz, candidate) else {
                    continue;
                };
                if instant <= last {
                    continue;
                }
                if let Some(bound) = bound_utc
                    && instant > bound
                {
                    continue;
                }
                occurrences.push(instant);
                last = instant;
                emitted = true;
            }
            // The anchor's own period always counts toward COUNT, even when
            // its only candidate is the anchor itself.
            if emitted || step == 0 {
                productive_periods += 1;
            }

            match period.advance(rule.frequency, rule.interval) {
                Some(next) => period = next,
                None => break,
            }
        }

        tracing::trace!(count = occurrences.len(), "expanded recurrence rule");
        occurrences
    }

    /// Resolves UNTIL to a UTC instant. A bare date is local midnight in the
    /// anchor's timezone.
    fn until_instant(&self, tz: Tz) -> Option<DateTime<Utc>> {
        match self.rule.until? {
            Until::DateTime(instant) => Some(instant),
            Until::Date(date) => {
                let midnight = date.and_time(NaiveTime::MIN);
                to_instant(tz, midnight).or_else(|| Some(midnight.and_utc()))
            }
        }
    }

    /// Times of day for each date candidate: the BYHOUR/BYMINUTE/BYSECOND
    /// cross product substituted into the anchor's own time of day.
    fn expanded_times(&self, base: NaiveTime) -> Vec<NaiveTime> {
        let rule = self.rule;
        let hours: Vec<u32> = if rule.by_hour.is_empty() {
            vec![base.hour()]
        } else {
            rule.by_hour.iter().map(|&h| u32::from(h)).collect()
        };
        let minutes: Vec<u32> = if rule.by_minute.is_empty() {
            vec![base.minute()]
        } else {
            rule.by_minute.iter().map(|&m| u32::from(m)).collect()
        };
        let seconds: Vec<u32> = if rule.by_second.is_empty() {
            vec![base.second()]
        } else {
            rule.by_second.iter().map(|&s| u32::from(s)).collect()
        };

        let mut times = Vec::with_capacity(hours.len() * minutes.len() * seconds.len());
        for &hour in &hours {
            for &minute in &minutes {
                for &second in &seconds {
                    times.extend(make_time(hour, minute, second));
                }
            }
        }
        times.sort_unstable();
        times.dedup();
        times
    }

    /// Candidate instants for one period window, sorted, de-duplicated, and
    /// reduced by BYSETPOS.
    fn period_candidates(
        &self,
        period: Period,
        anchor_date: NaiveDate,
        times: &[NaiveTime],
    ) -> Vec<NaiveDateTime> {
        let rule = self.rule;

        if rule.frequency.is_sub_daily() {
            // BYHOUR/BYMINUTE/BYSECOND restrict the stepped instant here
            // instead of fanning it out.
            let Period::Fine(instant) = period else {
                return Vec::new();
            };
            if self.passes_date_filters(instant.date()) && self.passes_time_filters(instant.time())
            {
                return vec![instant];
            }
            return Vec::new();
        }

        let days = match period {
            Period::Fine(instant) => {
                let date = instant.date();
                if self.passes_date_filters(date) {
                    vec![date]
                } else {
                    Vec::new()
                }
            }
            Period::Week(start) => self.week_days(start),
            Period::Month { year, month } => {
                if rule.by_month.is_empty()
                    || rule.by_month.iter().any(|&m| u32::from(m) == month)
                {
                    self.month_days(year, month, anchor_date)
                } else {
                    Vec::new()
                }
            }
            Period::Year(year) => self.year_days(year, anchor_date),
        };

        let mut candidates = Vec::with_capacity(days.len() * times.len());
        for day in days {
            for time in times {
                candidates.push(day.and_time(*time));
            }
        }
        candidates.sort_unstable();
        candidates.dedup();
        apply_set_pos(&rule.by_set_pos, candidates)
    }

    /// Date candidates for a weekly window: the listed BYDAY weekdays, or
    /// every day of the week when BYDAY is absent.
    fn week_days(&self, start: NaiveDate) -> Vec<NaiveDate> {
        let rule = self.rule;
        let mut days = Vec::new();
        if rule.by_day.is_empty() {
            for offset in 0..7 {
                days.extend(start.checked_add_signed(Duration::days(offset)));
            }
        } else {
            for entry in &rule.by_day {
                let offset = i64::from(entry.weekday.days_from(rule.week_start));
                days.extend(start.checked_add_signed(Duration::days(offset)));
            }
        }
        days.retain(|day| self.passes_date_filters(*day));
        days.sort_unstable();
        days
    }

    /// Date candidates for a monthly window.
    fn month_days(&self, year: i32, month: u32, anchor_date: NaiveDate) -> Vec<NaiveDate> {
        let rule = self.rule;
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Vec::new();
        };
        let Some(last) = calendar::month_day(year, month, -1) else {
            return Vec::new();
        };

        let mut days: Vec<NaiveDate> = if !rule.by_month_day.is_empty() {
            let mut days: Vec<NaiveDate> = rule
                .by_month_day
                .iter()
                .filter_map(|&day| calendar::month_day(year, month, day))
                .collect();
            if !rule.by_day.is_empty() {
                days.retain(|day| self.weekday_listed(*day));
            }
            days
        } else if !rule.by_day.is_empty() {
            self.by_day_days(first, last)
        } else {
            // The anchor's own day of month; absent from short months.
            i8::try_from(anchor_date.day())
                .ok()
                .and_then(|day| calendar::month_day(year, month, day))
                .into_iter()
                .collect()
        };
        days.sort_unstable();
        days.dedup();
        days
    }

    /// Date candidates for a yearly window. BYMONTH, BYWEEKNO, and BYYEARDAY
    /// (in that order of precedence) pick the expansion shape; the remaining
    /// BY* date parts act as restrictions.
    fn year_days(&self, year: i32, anchor_date: NaiveDate) -> Vec<NaiveDate> {
        let rule = self.rule;
        let mut days: Vec<NaiveDate> = if !rule.by_month.is_empty() {
            let mut days = Vec::new();
            for &month in &rule.by_month {
                days.extend(self.month_days(year, u32::from(month), anchor_date));
            }
            days
        } else if !rule.by_week_no.is_empty() {
            let mut days = Vec::new();
            for &week in &rule.by_week_no {
                let Some(start) = calendar::week_no_start(year, week, rule.week_start) else {
                    continue;
                };
                if rule.by_day.is_empty() {
                    let weekday = Weekday::from_chrono(anchor_date.weekday());
                    let offset = i64::from(weekday.days_from(rule.week_start));
                    days.extend(start.checked_add_signed(Duration::days(offset)));
                } else {
                    for entry in &rule.by_day {
                        let offset = i64::from(entry.weekday.days_from(rule.week_start));
                        days.extend(start.checked_add_signed(Duration::days(offset)));
                    }
                }
            }
            if !rule.by_month_day.is_empty() {
                days.retain(|day| self.matches_month_day(*day));
            }
            days
        } else if !rule.by_year_day.is_empty() {
            let mut days: Vec<NaiveDate> = rule
                .by_year_day
                .iter()
                .filter_map(|&day| calendar::year_day(year, day))
                .collect();
            if !rule.by_day.is_empty() {
                days.retain(|day| self.weekday_listed(*day));
            }
            if !rule.by_month_day.is_empty() {
                days.retain(|day| self.matches_month_day(*day));
            }
            days
        } else if !rule.by_month_day.is_empty() {
            let mut days = Vec::new();
            for month in 1..=12 {
                days.extend(
                    rule.by_month_day
                        .iter()
                        .filter_map(|&day| calendar::month_day(year, month, day)),
                );
            }
            if !rule.by_day.is_empty() {
                days.retain(|day| self.weekday_listed(*day));
            }
            days
        } else if !rule.by_day.is_empty() {
            match (
                NaiveDate::from_ymd_opt(year, 1, 1),
                NaiveDate::from_ymd_opt(year, 12, 31),
            ) {
                (Some(first), Some(last)) => self.by_day_days(first, last),
                _ => Vec::new(),
            }
        } else {
            // The anchor's own month and day; Feb 29 is absent from common
            // years.
            NaiveDate::from_ymd_opt(year, anchor_date.month(), anchor_date.day())
                .into_iter()
                .collect()
        };
        days.sort_unstable();
        days.dedup();
        days
    }

    /// Resolves the BYDAY entries inside `first..=last`: ordinal entries pick
    /// the N-th matching weekday, plain entries every one.
    fn by_day_days(&self, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        for entry in &self.rule.by_day {
            match entry.ordinal {
                None => days.extend(calendar::weekdays_in(first, last, entry.weekday)),
                Some(ordinal) => {
                    days.extend(calendar::nth_weekday_in(first, last, entry.weekday, ordinal));
                }
            }
        }
        days
    }

    fn passes_date_filters(&self, date: NaiveDate) -> bool {
        let rule = self.rule;
        (rule.by_month.is_empty() || rule.by_month.iter().any(|&m| u32::from(m) == date.month()))
            && (rule.by_month_day.is_empty() || self.matches_month_day(date))
            && (rule.by_year_day.is_empty() || self.matches_year_day(date))
            && (rule.by_day.is_empty() || self.weekday_listed(date))
    }

    fn passes_time_filters(&self, time: NaiveTime) -> bool {
        let rule = self.rule;
        (rule.by_hour.is_empty() || rule.by_hour.iter().any(|&h| u32::from(h) == time.hour()))
            && (rule.by_minute.is_empty()
                || rule.by_minute.iter().any(|&m| u32::from(m) == time.minute()))
            && (rule.by_second.is_empty()
                || rule.by_second.iter().any(|&s| u32::from(s) == time.second()))
    }

    /// Weekday-only BYDAY match, used when another part enumerates the dates.
    fn weekday_listed(&self, date: NaiveDate) -> bool {
        let weekday = Weekday::from_chrono(date.weekday());
        self.rule.by_day.iter().any(|entry| entry.weekday == weekday)
    }

    fn matches_month_day(&self, date: NaiveDate) -> bool {
        self.rule
            .by_month_day
            .iter()
            .any(|&day| calendar::month_day(date.year(), date.month(), day) == Some(date))
    }

    fn matches_year_day(&self, date: NaiveDate) -> bool {
        self.rule
            .by_year_day
            .iter()
            .any(|&day| calendar::year_day(date.year(), day) == Some(date))
    }
}

impl RecurRule {
    /// Expands this rule against an anchor with default options.
    ///
    /// `now` is the reference instant bounding open-ended series.
    #[must_use]
    pub fn expand(&self, anchor: &Anchor, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        Expander::new(self).occurrences(anchor, now)
    }
}

/// One period window of the rule's frequency.
#[derive(Debug, Clone, Copy)]
enum Period {
    /// A single stepped instant (SECONDLY through DAILY).
    Fine(NaiveDateTime),
    /// A week, identified by its first day.
    Week(NaiveDate),
    /// A calendar month.
    Month { year: i32, month: u32 },
    /// A calendar year.
    Year(i32),
}

impl Period {
    /// The period containing the anchor.
    fn containing(start: NaiveDateTime, rule: &RecurRule) -> Self {
        match rule.frequency {
            Frequency::Secondly | Frequency::Minutely | Frequency::Hourly | Frequency::Daily => {
                Self::Fine(start)
            }
            Frequency::Weekly => Self::Week(calendar::week_start_of(start.date(), rule.week_start)),
            Frequency::Monthly => Self::Month {
                year: start.date().year(),
                month: start.date().month(),
            },
            Frequency::Yearly => Self::Year(start.date().year()),
        }
    }

    /// Local lower bound of the window, used for the termination test.
    /// `None` means the calendar range was exceeded.
    fn base_local(self, frequency: Frequency) -> Option<NaiveDateTime> {
        match self {
            Self::Fine(instant) => Some(if frequency == Frequency::Daily {
                instant.date().and_time(NaiveTime::MIN)
            } else {
                instant
            }),
            Self::Week(start) => Some(start.and_time(NaiveTime::MIN)),
            Self::Month { year, month } => {
                Some(NaiveDate::from_ymd_opt(year, month, 1)?.and_time(NaiveTime::MIN))
            }
            Self::Year(year) => Some(NaiveDate::from_ymd_opt(year, 1, 1)?.and_time(NaiveTime::MIN)),
        }
    }

    /// The next window, `interval` frequency units later. `None` saturates
    /// instead of overflowing.
    fn advance(self, frequency: Frequency, interval: u32) -> Option<Self> {
        let step = i64::from(interval);
        match self {
            Self::Fine(instant) => {
                let delta = match frequency {
                    Frequency::Secondly => Duration::seconds(step),
                    Frequency::Minutely => Duration::minutes(step),
                    Frequency::Hourly => Duration::hours(step),
                    _ => Duration::days(step),
                };
                instant.checked_add_signed(delta).map(Self::Fine)
            }
            Self::Week(start) => start
                .checked_add_signed(Duration::weeks(step))
                .map(Self::Week),
            Self::Month { year, month } => {
                let index = i64::from(year) * 12 + i64::from(month) - 1 + step;
                let year = i32::try_from(index.div_euclid(12)).ok()?;
                let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
                Some(Self::Month { year, month })
            }
            Self::Year(year) => {
                let next = year.checked_add(i32::try_from(step).ok()?)?;
                Some(Self::Year(next))
            }
        }
    }
}

/// Selects the listed 1-based (or negative, from-the-end) positions out of a
/// period's sorted candidate set.
fn apply_set_pos(positions: &[i16], candidates: Vec<NaiveDateTime>) -> Vec<NaiveDateTime> {
    if positions.is_empty() || candidates.is_empty() {
        return candidates;
    }
    let len = i64::try_from(candidates.len()).unwrap_or(i64::MAX);
    let mut selected: Vec<NaiveDateTime> = positions
        .iter()
        .filter_map(|&position| {
            let index = if position > 0 {
                i64::from(position) - 1
            } else {
                len + i64::from(position)
            };
            usize::try_from(index)
                .ok()
                .and_then(|i| candidates.get(i).copied())
        })
        .collect();
    selected.sort_unstable();
    selected.dedup();
    selected
}

/// Resolves a local wall-clock time to a UTC instant. A time erased by a DST
/// gap yields nothing; an ambiguous one resolves to the earlier instant.
fn to_instant(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|instant| instant.with_timezone(&Utc))
}

/// The unbounded-series cutoff, `horizon_years` past the reference instant.
fn horizon_instant(now: DateTime<Utc>, horizon_years: u32) -> DateTime<Utc> {
    let months = horizon_years.saturating_mul(12);
    now.checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Builds a time of day, admitting 60 as a leap second.
fn make_time(hour: u32, minute: u32, second: u32) -> Option<NaiveTime> {
    if second == 60 {
        // chrono models a leap second as second 59 plus an extra second of
        // nanoseconds.
        NaiveTime::from_hms_nano_opt(hour, minute, 59, 1_000_000_000)
    } else {
        NaiveTime::from_hms_opt(hour, minute, second)
    }
}
