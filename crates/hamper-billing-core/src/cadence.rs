//! Cadence date arithmetic
//!
//! Due dates advance from their current value, not from "today", so a
//! subscription billed late does not drift. Monthly advances follow
//! calendar-month semantics: the day of month is clamped to the target
//! month's length (Jan 31 -> Feb 28, or Feb 29 in a leap year).

use chrono::{Days, Months, NaiveDate};
use hamper_types::Frequency;

/// The next due date one cadence unit after `from`
pub fn advance(frequency: Frequency, from: NaiveDate) -> NaiveDate {
    let next = match frequency {
        Frequency::Daily => from.checked_add_days(Days::new(1)),
        Frequency::Weekly => from.checked_add_days(Days::new(7)),
        Frequency::Monthly => from.checked_add_months(Months::new(1)),
    };
    next.unwrap_or(from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_advance() {
        assert_eq!(
            advance(Frequency::Daily, date(2026, 3, 14)),
            date(2026, 3, 15)
        );
        // Month boundary
        assert_eq!(
            advance(Frequency::Daily, date(2026, 3, 31)),
            date(2026, 4, 1)
        );
    }

    #[test]
    fn test_weekly_advance() {
        assert_eq!(
            advance(Frequency::Weekly, date(2026, 3, 14)),
            date(2026, 3, 21)
        );
        // Year boundary
        assert_eq!(
            advance(Frequency::Weekly, date(2025, 12, 29)),
            date(2026, 1, 5)
        );
    }

    #[test]
    fn test_monthly_advance_clamps_to_month_end() {
        assert_eq!(
            advance(Frequency::Monthly, date(2026, 1, 31)),
            date(2026, 2, 28)
        );
        assert_eq!(
            advance(Frequency::Monthly, date(2024, 1, 31)),
            date(2024, 2, 29)
        );
        assert_eq!(
            advance(Frequency::Monthly, date(2026, 3, 31)),
            date(2026, 4, 30)
        );
    }

    #[test]
    fn test_monthly_advance_plain_day() {
        assert_eq!(
            advance(Frequency::Monthly, date(2026, 3, 14)),
            date(2026, 4, 14)
        );
        assert_eq!(
            advance(Frequency::Monthly, date(2026, 12, 14)),
            date(2027, 1, 14)
        );
    }
}
