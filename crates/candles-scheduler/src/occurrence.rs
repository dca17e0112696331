//! Next-occurrence resolution — pure date arithmetic, no side effects.

use chrono::{Datelike, NaiveDate};

/// The earliest date on or after `today` carrying the event's month/day.
///
/// Replace the event's year with today's; if that lands strictly before
/// today, use next year instead. A Feb-29 event is observed on Feb 28 in
/// non-leap target years.
pub fn next_occurrence(today: NaiveDate, event: NaiveDate) -> NaiveDate {
    let this_year = occurrence_in(today.year(), event);
    if this_year < today {
        occurrence_in(today.year() + 1, event)
    } else {
        this_year
    }
}

/// Days from `today` until `occurrence`. Non-negative when `occurrence`
/// came from [`next_occurrence`].
pub fn days_until(today: NaiveDate, occurrence: NaiveDate) -> i64 {
    (occurrence - today).num_days()
}

fn occurrence_in(year: i32, event: NaiveDate) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, event.month(), event.day()) {
        Some(date) => date,
        // Only Feb 29 in a non-leap year lands here; clamp to Feb 28.
        None => NaiveDate::from_ymd_opt(year, 2, 28).unwrap_or(event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_future_date_stays_this_year() {
        let next = next_occurrence(date(2024, 6, 30), date(2020, 7, 1));
        assert_eq!(next, date(2024, 7, 1));
    }

    #[test]
    fn test_today_counts_as_this_year() {
        let next = next_occurrence(date(2024, 7, 1), date(2019, 7, 1));
        assert_eq!(next, date(2024, 7, 1));
        assert_eq!(days_until(date(2024, 7, 1), next), 0);
    }

    #[test]
    fn test_past_date_rolls_to_next_year() {
        let next = next_occurrence(date(2024, 7, 2), date(2019, 7, 1));
        assert_eq!(next, date(2025, 7, 1));
    }

    #[test]
    fn test_result_never_before_today() {
        let today = date(2024, 3, 15);
        for (m, d) in [(1, 1), (3, 14), (3, 15), (3, 16), (12, 31)] {
            let next = next_occurrence(today, date(1999, m, d));
            assert!(next >= today, "{m}-{d} resolved before today");
            assert_eq!((next.month(), next.day()), (m, d));
        }
    }

    #[test]
    fn test_leap_day_in_leap_year() {
        let next = next_occurrence(date(2024, 1, 10), date(2000, 2, 29));
        assert_eq!(next, date(2024, 2, 29));
    }

    #[test]
    fn test_leap_day_clamps_to_feb_28() {
        // 2025 is not a leap year: observe on Feb 28.
        let next = next_occurrence(date(2025, 1, 10), date(2000, 2, 29));
        assert_eq!(next, date(2025, 2, 28));
    }

    #[test]
    fn test_leap_day_after_clamped_date_rolls_forward() {
        // Past Feb 28 in a non-leap year, the next observation is Feb 28
        // of... 2026 is also non-leap, so Feb 28 again.
        let next = next_occurrence(date(2025, 3, 1), date(2000, 2, 29));
        assert_eq!(next, date(2026, 2, 28));
    }

    #[test]
    fn test_days_until() {
        assert_eq!(days_until(date(2024, 6, 30), date(2024, 7, 1)), 1);
        assert_eq!(days_until(date(2024, 12, 31), date(2025, 1, 1)), 1);
    }
}
