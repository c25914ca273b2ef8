//! Calendar arithmetic for recurrence expansion.
//!
//! Signed day indices count backward from the end of their window (-1 is the
//! last day of the month/year, -1 week the last week of the year). Week
//! numbering follows the ISO 8601 rule generalized to an arbitrary week
//! start: week 1 is the first week with at least four days in the new year.

use chrono::{Datelike, Duration, NaiveDate};

use crate::core::Weekday;

/// Gregorian leap year rule.
#[must_use]
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in the given year.
#[must_use]
pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) { 366 } else { 365 }
}

/// Number of days in the given month, 0 for an invalid month number.
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Resolves a signed day-of-month index. Negative values count from the end
/// of the month; an index past the month's length resolves to nothing.
#[must_use]
pub fn month_day(year: i32, month: u32, day: i8) -> Option<NaiveDate> {
    let len = i32::try_from(days_in_month(year, month)).ok()?;
    let resolved = if day > 0 {
        i32::from(day)
    } else {
        i32::from(day) + len + 1
    };
    if resolved < 1 || resolved > len {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, u32::try_from(resolved).ok()?)
}

/// Resolves a signed day-of-year index. Negative values count from the end
/// of the year; 366 resolves to nothing in a 365-day year.
#[must_use]
pub fn year_day(year: i32, day: i16) -> Option<NaiveDate> {
    let len = i32::try_from(days_in_year(year)).ok()?;
    let resolved = if day > 0 {
        i32::from(day)
    } else {
        i32::from(day) + len + 1
    };
    if resolved < 1 || resolved > len {
        return None;
    }
    NaiveDate::from_yo_opt(year, u32::try_from(resolved).ok()?)
}

/// The latest date on or before `date` whose weekday is `week_start`.
#[must_use]
pub fn week_start_of(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = Weekday::from_chrono(date.weekday()).days_from(week_start);
    date - Duration::days(i64::from(offset))
}

/// First day of week 1 of the given year.
///
/// Week 1 is the first `week_start`-aligned week containing at least four
/// days of January; for a Monday week start this is exactly ISO 8601.
#[must_use]
pub fn week_one_start(year: i32, week_start: Weekday) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let start = week_start_of(jan1, week_start);
    let days_before_jan1 = (jan1 - start).num_days();
    if days_before_jan1 <= 3 {
        Some(start)
    } else {
        start.checked_add_signed(Duration::weeks(1))
    }
}

/// Number of numbered weeks in the given year (52 or 53).
#[must_use]
pub fn weeks_in_year(year: i32, week_start: Weekday) -> Option<i64> {
    let this = week_one_start(year, week_start)?;
    let next = week_one_start(year.checked_add(1)?, week_start)?;
    Some((next - this).num_days() / 7)
}

/// First day of the signed week number within the year. Negative numbers
/// count from the year's last numbered week.
#[must_use]
pub fn week_no_start(year: i32, week: i8, week_start: Weekday) -> Option<NaiveDate> {
    let total = weeks_in_year(year, week_start)?;
    let resolved = if week > 0 {
        i64::from(week)
    } else {
        i64::from(week) + total + 1
    };
    if resolved < 1 || resolved > total {
        return None;
    }
    week_one_start(year, week_start)?.checked_add_signed(Duration::weeks(resolved - 1))
}

/// All dates with the given weekday inside `first..=last`.
#[must_use]
pub fn weekdays_in(first: NaiveDate, last: NaiveDate, weekday: Weekday) -> Vec<NaiveDate> {
    let offset = weekday.days_from(Weekday::from_chrono(first.weekday()));
    let mut date = first + Duration::days(i64::from(offset));
    let mut dates = Vec::new();
    while date <= last {
        dates.push(date);
        match date.checked_add_signed(Duration::weeks(1)) {
            Some(next) => date = next,
            None => break,
        }
    }
    dates
}

/// The N-th occurrence (negative: from the end) of a weekday inside
/// `first..=last`, or nothing when the window has fewer occurrences.
#[must_use]
pub fn nth_weekday_in(
    first: NaiveDate,
    last: NaiveDate,
    weekday: Weekday,
    ordinal: i32,
) -> Option<NaiveDate> {
    let all = weekdays_in(first, last, weekday);
    let len = i64::try_from(all.len()).ok()?;
    let index = if ordinal > 0 {
        i64::from(ordinal) - 1
    } else {
        len + i64::from(ordinal)
    };
    usize::try_from(index).ok().and_then(|i| all.get(i).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn leap_year_rule() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2026));
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2026, 1), 31);
        assert_eq!(days_in_month(2026, 4), 30);
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
    }

    #[test]
    fn month_day_signed_resolution() {
        assert_eq!(month_day(2026, 1, 20), Some(date(2026, 1, 20)));
        assert_eq!(month_day(2026, 1, -1), Some(date(2026, 1, 31)));
        assert_eq!(month_day(2026, 2, -28), Some(date(2026, 2, 1)));
        // 31st of April does not exist.
        assert_eq!(month_day(2026, 4, 31), None);
        assert_eq!(month_day(2026, 2, -29), None);
    }

    #[test]
    fn year_day_signed_resolution() {
        assert_eq!(year_day(2026, 1), Some(date(2026, 1, 1)));
        assert_eq!(year_day(2026, -1), Some(date(2026, 12, 31)));
        assert_eq!(year_day(2026, 300), Some(date(2026, 10, 27)));
        assert_eq!(year_day(2026, 366), None);
        assert_eq!(year_day(2024, 366), Some(date(2024, 12, 31)));
    }

    #[test]
    fn week_start_alignment() {
        // 2026-08-05 is a Wednesday.
        assert_eq!(
            week_start_of(date(2026, 8, 5), Weekday::Monday),
            date(2026, 8, 3)
        );
        assert_eq!(
            week_start_of(date(2026, 8, 5), Weekday::Sunday),
            date(2026, 8, 2)
        );
        assert_eq!(
            week_start_of(date(2026, 8, 3), Weekday::Monday),
            date(2026, 8, 3)
        );
    }

    #[test]
    fn week_one_matches_iso_for_monday_start() {
        for year in [2015, 2016, 2020, 2024, 2026] {
            let start = week_one_start(year, Weekday::Monday).unwrap();
            assert_eq!(start.iso_week().week(), 1);
            assert_eq!(start.weekday(), chrono::Weekday::Mon);
        }
    }

    #[test]
    fn weeks_per_year_matches_iso_for_monday_start() {
        // 2015 and 2020 are 53-week ISO years.
        assert_eq!(weeks_in_year(2015, Weekday::Monday), Some(53));
        assert_eq!(weeks_in_year(2020, Weekday::Monday), Some(53));
        assert_eq!(weeks_in_year(2026, Weekday::Monday), Some(53));
        assert_eq!(weeks_in_year(2024, Weekday::Monday), Some(52));
    }

    #[test]
    fn week_no_start_signed_resolution() {
        // ISO week 1 of 2026 starts Monday 2025-12-29.
        assert_eq!(
            week_no_start(2026, 1, Weekday::Monday),
            Some(date(2025, 12, 29))
        );
        // Last (53rd) week of 2026 starts Monday 2026-12-28.
        assert_eq!(
            week_no_start(2026, -1, Weekday::Monday),
            Some(date(2026, 12, 28))
        );
        assert_eq!(week_no_start(2024, 53, Weekday::Monday), None);
    }

    #[test]
    fn nth_weekday_resolution() {
        let first = date(2026, 8, 1);
        let last = date(2026, 8, 31);
        // First Monday of August 2026 is the 3rd, the last the 31st.
        assert_eq!(
            nth_weekday_in(first, last, Weekday::Monday, 1),
            Some(date(2026, 8, 3))
        );
        assert_eq!(
            nth_weekday_in(first, last, Weekday::Monday, -1),
            Some(date(2026, 8, 31))
        );
        assert_eq!(nth_weekday_in(first, last, Weekday::Monday, 6), None);
        assert_eq!(
            weekdays_in(first, last, Weekday::Monday),
            vec![
                date(2026, 8, 3),
                date(2026, 8, 10),
                date(2026, 8, 17),
                date(2026, 8, 24),
                date(2026, 8, 31),
            ]
        );
    }
}
