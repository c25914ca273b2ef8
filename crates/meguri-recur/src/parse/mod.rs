//! Recurrence-rule parsing and validation (RFC 5545 §3.3.10).
//!
//! [`parse`] turns `KEY=VALUE;KEY=VALUE` recurrence text into a validated
//! [`RecurRule`]. Every component value is checked against its legal domain
//! before a rule is returned; invalid input is rejected whole, never
//! partially applied.

mod error;

pub use error::{RuleError, RuleResult};

use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::core::{Component, Frequency, RecurRule, Until, Weekday, WeekdayNum};

/// Parses and validates a recurrence rule string.
///
/// ## Errors
///
/// Returns a [`RuleError`] describing the first offending component when the
/// input is structurally or semantically invalid.
#[tracing::instrument(skip(raw), fields(raw_len = raw.len()))]
pub fn parse(raw: &str) -> RuleResult<RecurRule> {
    let mut builder = RuleBuilder::default();

    for part in raw.split(';') {
        if part.is_empty() {
            // A trailing `;` is accepted.
            continue;
        }
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| RuleError::UnknownComponent(part.to_owned()))?;
        let component =
            Component::parse(key).ok_or_else(|| RuleError::UnknownComponent(key.to_owned()))?;
        builder.apply(component, value)?;
    }

    let rule = builder.finish()?;
    tracing::debug!(rule = %rule, "parsed recurrence rule");
    Ok(rule)
}

impl FromStr for RecurRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Accumulates components while detecting duplicates, then runs the
/// cross-field checks.
#[derive(Debug, Default)]
struct RuleBuilder {
    frequency: Option<Frequency>,
    interval: Option<u32>,
    count: Option<u32>,
    until: Option<Until>,
    week_start: Option<Weekday>,
    by_second: Option<Vec<u8>>,
    by_minute: Option<Vec<u8>>,
    by_hour: Option<Vec<u8>>,
    by_day: Option<Vec<WeekdayNum>>,
    by_month_day: Option<Vec<i8>>,
    by_year_day: Option<Vec<i16>>,
    by_week_no: Option<Vec<i8>>,
    by_month: Option<Vec<u8>>,
    by_set_pos: Option<Vec<i16>>,
}

impl RuleBuilder {
    fn apply(&mut self, component: Component, value: &str) -> RuleResult<()> {
        match component {
            Component::Freq => {
                let freq = Frequency::parse(value)
                    .ok_or_else(|| RuleError::InvalidFrequencyValue(value.to_owned()))?;
                set_once(&mut self.frequency, component, freq)
            }
            Component::Interval => {
                let interval: u32 = value.parse().map_err(|_| RuleError::InvalidInterval)?;
                if interval == 0 {
                    return Err(RuleError::InvalidInterval);
                }
                set_once(&mut self.interval, component, interval)
            }
            Component::Count => {
                let count = value
                    .parse()
                    .map_err(|_| RuleError::OutOfRangeValue(component))?;
                set_once(&mut self.count, component, count)
            }
            Component::Until => set_once(&mut self.until, component, parse_until(value)?),
            Component::Wkst => {
                let day = Weekday::parse(value).ok_or(RuleError::OutOfRangeValue(component))?;
                set_once(&mut self.week_start, component, day)
            }
            Component::BySecond => {
                // 60 is admitted for a leap second.
                let list = parse_u8_list(component, value, 0..=60)?;
                set_once(&mut self.by_second, component, list)
            }
            Component::ByMinute => {
                let list = parse_u8_list(component, value, 0..=59)?;
                set_once(&mut self.by_minute, component, list)
            }
            Component::ByHour => {
                let list = parse_u8_list(component, value, 0..=23)?;
                set_once(&mut self.by_hour, component, list)
            }
            Component::ByDay => set_once(&mut self.by_day, component, parse_by_day(value)?),
            Component::ByMonthDay => {
                let list = parse_i8_list(component, value, 31)?;
                set_once(&mut self.by_month_day, component, list)
            }
            Component::ByYearDay => {
                let list = parse_i16_list(component, value, 366)?;
                set_once(&mut self.by_year_day, component, list)
            }
            Component::ByWeekNo => {
                let list = parse_i8_list(component, value, 53)?;
                set_once(&mut self.by_week_no, component, list)
            }
            Component::ByMonth => {
                let list = parse_u8_list(component, value, 1..=12)?;
                set_once(&mut self.by_month, component, list)
            }
            Component::BySetPos => {
                let list = parse_i16_list(component, value, 366)?;
                set_once(&mut self.by_set_pos, component, list)
            }
        }
    }

    fn finish(self) -> RuleResult<RecurRule> {
        let frequency = self.frequency.ok_or(RuleError::MissingFrequency)?;
        if self.count.is_some() && self.until.is_some() {
            return Err(RuleError::ConflictingBound);
        }

        let rule = RecurRule {
            frequency,
            interval: self.interval.unwrap_or(1),
            count: self.count,
            until: self.until,
            week_start: self.week_start.unwrap_or(Weekday::Monday),
            by_second: self.by_second.unwrap_or_default(),
            by_minute: self.by_minute.unwrap_or_default(),
            by_hour: self.by_hour.unwrap_or_default(),
            by_day: self.by_day.unwrap_or_default(),
            by_month_day: self.by_month_day.unwrap_or_default(),
            by_year_day: self.by_year_day.unwrap_or_default(),
            by_week_no: self.by_week_no.unwrap_or_default(),
            by_month: self.by_month.unwrap_or_default(),
            by_set_pos: self.by_set_pos.unwrap_or_default(),
        };

        if !rule.by_set_pos.is_empty() && !rule.has_by_part() {
            return Err(RuleError::UnsupportedSetPos);
        }

        Ok(rule)
    }
}

fn set_once<T>(slot: &mut Option<T>, component: Component, value: T) -> RuleResult<()> {
    if slot.is_some() {
        return Err(RuleError::DuplicateComponent(component));
    }
    *slot = Some(value);
    Ok(())
}

/// Parses an UNTIL value: a bare date (`YYYYMMDD`) or a UTC date-time
/// (`YYYYMMDDTHHMMSSZ`).
fn parse_until(value: &str) -> RuleResult<Until> {
    if value.contains('T') {
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ")
            .map(|dt| Until::DateTime(dt.and_utc()))
            .map_err(|_| RuleError::OutOfRangeValue(Component::Until))
    } else {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .map(Until::Date)
            .map_err(|_| RuleError::OutOfRangeValue(Component::Until))
    }
}

/// Parses a comma-separated list of u8 values inside `range`.
fn parse_u8_list(
    component: Component,
    value: &str,
    range: RangeInclusive<u8>,
) -> RuleResult<Vec<u8>> {
    value
        .split(',')
        .map(|v| {
            v.parse::<u8>()
                .ok()
                .filter(|n| range.contains(n))
                .ok_or(RuleError::OutOfRangeValue(component))
        })
        .collect()
}

/// Parses a comma-separated list of non-zero i8 values in `-max..=max`.
fn parse_i8_list(component: Component, value: &str, max: i8) -> RuleResult<Vec<i8>> {
    value
        .split(',')
        .map(|v| {
            v.parse::<i8>()
                .ok()
                .filter(|&n| n != 0 && n.abs() <= max)
                .ok_or(RuleError::OutOfRangeValue(component))
        })
        .collect()
}

/// Parses a comma-separated list of non-zero i16 values in `-max..=max`.
fn parse_i16_list(component: Component, value: &str, max: i16) -> RuleResult<Vec<i16>> {
    value
        .split(',')
        .map(|v| {
            v.parse::<i16>()
                .ok()
                .filter(|&n| n != 0 && n.abs() <= max)
                .ok_or(RuleError::OutOfRangeValue(component))
        })
        .collect()
}

/// Parses a BYDAY value (weekday codes with optional signed ordinals).
fn parse_by_day(value: &str) -> RuleResult<Vec<WeekdayNum>> {
    value.split(',').map(parse_weekday_num).collect()
}

/// Parses a single BYDAY token (`MO`, `1MO`, `-1FR`, ...).
fn parse_weekday_num(token: &str) -> RuleResult<WeekdayNum> {
    let malformed = || RuleError::MalformedByDay(token.to_owned());

    // The last two characters are the weekday code, anything before it the
    // ordinal.
    if token.len() < 2 || !token.is_char_boundary(token.len() - 2) {
        return Err(malformed());
    }
    let (ordinal_str, code) = token.split_at(token.len() - 2);

    let weekday = Weekday::parse(code).ok_or_else(malformed)?;
    let ordinal = if ordinal_str.is_empty() {
        None
    } else {
        let n: i32 = ordinal_str.parse().map_err(|_| malformed())?;
        if n == 0 {
            return Err(malformed());
        }
        Some(n)
    };

    Ok(WeekdayNum { ordinal, weekday })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    #[test]
    fn parse_every_component() {
        let raw = "FREQ=DAILY;COUNT=3;INTERVAL=4;BYSECOND=20,40;BYMINUTE=2,30;BYHOUR=3,4;\
                   BYDAY=MO,TH;BYMONTHDAY=20,30;BYYEARDAY=300,-20;BYWEEKNO=22,33;BYMONTH=3,4";
        let rule = parse(raw).unwrap();
        assert_eq!(rule.frequency, Frequency::Daily);
        assert_eq!(rule.count, Some(3));
        assert_eq!(rule.interval, 4);
        assert_eq!(rule.by_second, vec![20, 40]);
        assert_eq!(rule.by_minute, vec![2, 30]);
        assert_eq!(rule.by_hour, vec![3, 4]);
        assert_eq!(
            rule.by_day,
            vec![
                WeekdayNum::every(Weekday::Monday),
                WeekdayNum::every(Weekday::Thursday),
            ]
        );
        assert_eq!(rule.by_month_day, vec![20, 30]);
        assert_eq!(rule.by_year_day, vec![300, -20]);
        assert_eq!(rule.by_week_no, vec![22, 33]);
        assert_eq!(rule.by_month, vec![3, 4]);
        assert!(rule.by_set_pos.is_empty());
        assert_eq!(rule.week_start, Weekday::Monday);
    }

    #[test]
    fn parse_accepts_trailing_semicolon() {
        let rule = parse("FREQ=DAILY;").unwrap();
        assert_eq!(rule.frequency, Frequency::Daily);
        assert_eq!(rule.interval, 1);
    }

    #[test]
    fn parse_rejects_unknown_component() {
        assert_eq!(
            parse("RANDOM=PROPERTY;"),
            Err(RuleError::UnknownComponent("RANDOM".to_owned()))
        );
    }

    #[test]
    fn parse_rejects_token_without_separator() {
        assert_eq!(
            parse("FREQ=DAILY;NONSENSE"),
            Err(RuleError::UnknownComponent("NONSENSE".to_owned()))
        );
    }

    #[test]
    fn parse_rejects_unknown_frequency() {
        assert_eq!(
            parse("FREQ=RANDOMLY;"),
            Err(RuleError::InvalidFrequencyValue("RANDOMLY".to_owned()))
        );
    }

    #[test]
    fn parse_rejects_missing_frequency() {
        assert_eq!(parse("COUNT=3"), Err(RuleError::MissingFrequency));
        assert_eq!(parse(""), Err(RuleError::MissingFrequency));
    }

    #[test]
    fn parse_rejects_duplicate_components() {
        assert_eq!(
            parse("FREQ=DAILY;FREQ=WEEKLY"),
            Err(RuleError::DuplicateComponent(Component::Freq))
        );
        assert_eq!(
            parse("FREQ=DAILY;BYMONTH=1;BYMONTH=2"),
            Err(RuleError::DuplicateComponent(Component::ByMonth))
        );
    }

    #[test]
    fn parse_rejects_count_with_until() {
        assert_eq!(
            parse("FREQ=DAILY;COUNT=2;UNTIL=20260401"),
            Err(RuleError::ConflictingBound)
        );
    }

    #[test]
    fn parse_rejects_non_positive_interval() {
        assert_eq!(parse("FREQ=DAILY;INTERVAL=0"), Err(RuleError::InvalidInterval));
        assert_eq!(
            parse("FREQ=DAILY;INTERVAL=-2"),
            Err(RuleError::InvalidInterval)
        );
        assert_eq!(
            parse("FREQ=DAILY;INTERVAL=abc"),
            Err(RuleError::InvalidInterval)
        );
    }

    #[test]
    fn parse_bysecond_admits_leap_second() {
        let rule = parse("FREQ=MINUTELY;BYSECOND=30,45,60").unwrap();
        assert_eq!(rule.by_second, vec![30, 45, 60]);
    }

    #[test]
    fn parse_rejects_out_of_range_time_lists() {
        assert_eq!(
            parse("FREQ=DAILY;BYSECOND=30,61"),
            Err(RuleError::OutOfRangeValue(Component::BySecond))
        );
        assert_eq!(
            parse("FREQ=DAILY;BYMINUTE=30,45,60"),
            Err(RuleError::OutOfRangeValue(Component::ByMinute))
        );
        assert_eq!(
            parse("FREQ=DAILY;BYHOUR=23,45"),
            Err(RuleError::OutOfRangeValue(Component::ByHour))
        );
    }

    #[test]
    fn parse_rejects_malformed_byday() {
        assert_eq!(
            parse("FREQ=WEEKLY;BYDAY=MO,2SE"),
            Err(RuleError::MalformedByDay("2SE".to_owned()))
        );
        assert_eq!(
            parse("FREQ=WEEKLY;BYDAY=0MO"),
            Err(RuleError::MalformedByDay("0MO".to_owned()))
        );
        assert_eq!(
            parse("FREQ=WEEKLY;BYDAY=M"),
            Err(RuleError::MalformedByDay("M".to_owned()))
        );
    }

    #[test]
    fn parse_byday_ordinals() {
        let rule = parse("FREQ=MONTHLY;BYDAY=1MO,-1FR").unwrap();
        assert_eq!(
            rule.by_day,
            vec![
                WeekdayNum::nth(1, Weekday::Monday),
                WeekdayNum::nth(-1, Weekday::Friday),
            ]
        );
    }

    #[test]
    fn parse_rejects_bad_monthday() {
        for raw in [
            "FREQ=MONTHLY;BYMONTHDAY=1,32",
            "FREQ=MONTHLY;BYMONTHDAY=1,0",
            "FREQ=MONTHLY;BYMONTHDAY=1,-31,-32",
        ] {
            assert_eq!(
                parse(raw),
                Err(RuleError::OutOfRangeValue(Component::ByMonthDay))
            );
        }
        let rule = parse("FREQ=MONTHLY;BYMONTHDAY=31,-31").unwrap();
        assert_eq!(rule.by_month_day, vec![31, -31]);
    }

    #[test]
    fn parse_rejects_bad_yearday() {
        for raw in [
            "FREQ=YEARLY;BYYEARDAY=1,366,367",
            "FREQ=YEARLY;BYYEARDAY=0",
            "FREQ=YEARLY;BYYEARDAY=-1,-366,-367",
        ] {
            assert_eq!(
                parse(raw),
                Err(RuleError::OutOfRangeValue(Component::ByYearDay))
            );
        }
    }

    #[test]
    fn parse_rejects_bad_weekno() {
        for raw in [
            "FREQ=YEARLY;BYWEEKNO=1,53,54",
            "FREQ=YEARLY;BYWEEKNO=0",
            "FREQ=YEARLY;BYWEEKNO=-1,-53,-54",
        ] {
            assert_eq!(
                parse(raw),
                Err(RuleError::OutOfRangeValue(Component::ByWeekNo))
            );
        }
    }

    #[test]
    fn parse_rejects_bad_month() {
        assert_eq!(
            parse("FREQ=YEARLY;BYMONTH=1,12,13"),
            Err(RuleError::OutOfRangeValue(Component::ByMonth))
        );
        assert_eq!(
            parse("FREQ=YEARLY;BYMONTH=0"),
            Err(RuleError::OutOfRangeValue(Component::ByMonth))
        );
    }

    #[test]
    fn parse_rejects_setpos_without_other_by_parts() {
        assert_eq!(
            parse("FREQ=MONTHLY;BYSETPOS=1,366"),
            Err(RuleError::UnsupportedSetPos)
        );
    }

    #[test]
    fn parse_accepts_setpos_with_other_by_parts() {
        let rule = parse("FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1").unwrap();
        assert_eq!(rule.by_set_pos, vec![-1]);
    }

    #[test]
    fn parse_rejects_bad_setpos_values() {
        for raw in [
            "FREQ=MONTHLY;BYDAY=MO;BYSETPOS=1,366,367",
            "FREQ=MONTHLY;BYDAY=MO;BYSETPOS=0",
            "FREQ=MONTHLY;BYDAY=MO;BYSETPOS=-1,-366,-367",
        ] {
            assert_eq!(
                parse(raw),
                Err(RuleError::OutOfRangeValue(Component::BySetPos))
            );
        }
    }

    #[test]
    fn parse_wkst() {
        let rule = parse("FREQ=WEEKLY;WKST=SU").unwrap();
        assert_eq!(rule.week_start, Weekday::Sunday);
        assert_eq!(
            parse("FREQ=WEEKLY;WKST=XX"),
            Err(RuleError::OutOfRangeValue(Component::Wkst))
        );
    }

    #[test]
    fn parse_until_forms() {
        let rule = parse("FREQ=DAILY;UNTIL=20260401").unwrap();
        assert_eq!(
            rule.until,
            Some(Until::Date(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()))
        );

        let rule = parse("FREQ=DAILY;UNTIL=20260401T103000Z").unwrap();
        assert_eq!(
            rule.until,
            Some(Until::DateTime(
                Utc.with_ymd_and_hms(2026, 4, 1, 10, 30, 0).unwrap()
            ))
        );

        assert_eq!(
            parse("FREQ=DAILY;UNTIL=2026-04-01"),
            Err(RuleError::OutOfRangeValue(Component::Until))
        );
    }

    #[test]
    fn parse_display_round_trip() {
        for raw in [
            "FREQ=DAILY;COUNT=10",
            "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR",
            "FREQ=MONTHLY;UNTIL=20270101;BYDAY=-1FR",
            "FREQ=YEARLY;WKST=SU;BYWEEKNO=1,-1",
        ] {
            let rule = parse(raw).unwrap();
            assert_eq!(rule.to_string(), raw);
            assert_eq!(parse(&rule.to_string()).unwrap(), rule);
        }
    }

    #[test]
    fn from_str_delegates_to_parse() {
        let rule: RecurRule = "FREQ=DAILY;COUNT=2".parse().unwrap();
        assert_eq!(rule.count, Some(2));
    }
}
