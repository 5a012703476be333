//! Business-day arithmetic used by derived-field computation.
//!
//! A business day is a weekday that is not in the holiday set. Holidays are
//! a closed input supplied by [`crate::config::CycleTimeConstants`].

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashSet;

/// True if `date` is a weekday and not in `holidays`.
pub fn is_business_day(date: NaiveDate, holidays: &HashSet<NaiveDate>) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(&date)
}

/// Step backward one calendar day at a time, decrementing `n` only on
/// business days, until `n` business days have been skipped.
///
/// `n = 0` returns `from` unchanged. For `n >= 1` the result is always a
/// business day.
pub fn subtract_business_days(from: NaiveDate, n: u32, holidays: &HashSet<NaiveDate>) -> NaiveDate {
    if n == 0 {
        return from;
    }
    let mut date = from;
    let mut remaining = n;
    while remaining > 0 {
        date = date.pred_opt().expect("date underflow");
        if is_business_day(date, holidays) {
            remaining -= 1;
        }
    }
    date
}

/// Symmetric forward variant of [`subtract_business_days`].
pub fn add_business_days(from: NaiveDate, n: u32, holidays: &HashSet<NaiveDate>) -> NaiveDate {
    if n == 0 {
        return from;
    }
    let mut date = from;
    let mut remaining = n;
    while remaining > 0 {
        date = date.succ_opt().expect("date overflow");
        if is_business_day(date, holidays) {
            remaining -= 1;
        }
    }
    date
}

/// Count business days strictly between two dates (exclusive of both ends),
/// used by reporting/evaluation helpers that summarize lead time.
pub fn count_business_days_between(
    start: NaiveDate,
    end: NaiveDate,
    holidays: &HashSet<NaiveDate>,
) -> u32 {
    if start >= end {
        return 0;
    }
    let mut count = 0;
    let mut date = start;
    while date < end {
        date = date.succ_opt().expect("date overflow");
        if date < end && is_business_day(date, holidays) {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn subtract_zero_is_idempotent() {
        let holidays = HashSet::new();
        let d = ymd(2026, 7, 28);
        assert_eq!(subtract_business_days(d, 0, &holidays), d);
    }

    #[test]
    fn subtract_skips_weekend() {
        let holidays = HashSet::new();
        // Monday 2026-08-03 minus 1 business day -> Friday 2026-07-31
        let d = ymd(2026, 8, 3);
        assert_eq!(subtract_business_days(d, 1, &holidays), ymd(2026, 7, 31));
    }

    #[test]
    fn subtract_skips_holiday() {
        let mut holidays = HashSet::new();
        holidays.insert(ymd(2026, 7, 31)); // Friday holiday
        let d = ymd(2026, 8, 3); // Monday
        // Friday is a holiday, Thursday is the business day before it
        assert_eq!(subtract_business_days(d, 1, &holidays), ymd(2026, 7, 30));
    }

    #[test]
    fn subtract_result_is_always_business_day() {
        let holidays = HashSet::new();
        for n in 1..=10u32 {
            let result = subtract_business_days(ymd(2026, 8, 3), n, &holidays);
            assert!(is_business_day(result, &holidays), "n={n} result={result}");
        }
    }

    #[test]
    fn add_and_subtract_are_symmetric() {
        let holidays = HashSet::new();
        let d = ymd(2026, 7, 20); // Monday
        let forward = add_business_days(d, 5, &holidays);
        let back = subtract_business_days(forward, 5, &holidays);
        assert_eq!(back, d);
    }

    #[test]
    fn is_business_day_rejects_weekend() {
        let holidays = HashSet::new();
        assert!(!is_business_day(ymd(2026, 8, 1), &holidays)); // Saturday
        assert!(!is_business_day(ymd(2026, 8, 2), &holidays)); // Sunday
    }

    #[test]
    fn count_business_days_between_excludes_endpoints() {
        let holidays = HashSet::new();
        // Mon..Fri same week: 3 business days strictly between (Tue, Wed, Thu)
        let count = count_business_days_between(ymd(2026, 7, 20), ymd(2026, 7, 24), &holidays);
        assert_eq!(count, 3);
    }
}
