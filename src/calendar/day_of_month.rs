//! Resolution of a day-of-month pattern to a concrete date in a given month

use chrono::NaiveDate;

use super::{clamped_date, end_of_month, last_weekday_of_month, nth_weekday_of_month};
use crate::calendar::BusinessDayCalendar;
use crate::types::*;
use crate::utils::validation::{pattern_violations, validate_year_month};

/// Picks the day inside a month according to a [`DayOfMonthPattern`]
#[derive(Debug, Clone, Copy)]
pub struct DayOfMonthResolver<'a> {
    calendar: &'a BusinessDayCalendar,
}

impl<'a> DayOfMonthResolver<'a> {
    pub fn new(calendar: &'a BusinessDayCalendar) -> Self {
        Self { calendar }
    }

    /// Resolve `pattern` for `year`/`month`
    ///
    /// `default_day` is used when no pattern is set. Malformed patterns are
    /// rejected with `ValidationFailed`; they are normally caught when the
    /// definition is saved. A fifth weekday or n-th business day that the
    /// month does not have falls back to the last such day of the month, so
    /// that every month of a schedule resolves to a date.
    pub fn resolve(
        &self,
        year: i32,
        month: u32,
        pattern: Option<&DayOfMonthPattern>,
        default_day: u32,
    ) -> RecurringResult<NaiveDate> {
        validate_year_month(year, month)?;
        let invalid_month =
            || RecurringError::validation(format!("Invalid month {}-{:02}", year, month));

        let Some(pattern) = pattern else {
            return clamped_date(year, month, default_day).ok_or_else(invalid_month);
        };

        let reasons = pattern_violations(pattern);
        if !reasons.is_empty() {
            return Err(RecurringError::ValidationFailed(reasons));
        }

        match *pattern {
            DayOfMonthPattern::FixedDay(day) => {
                clamped_date(year, month, day).ok_or_else(invalid_month)
            }
            DayOfMonthPattern::EndOfMonth => end_of_month(year, month).ok_or_else(invalid_month),
            DayOfMonthPattern::LastBusinessDay => self.calendar.last_business_day(year, month),
            DayOfMonthPattern::LastBusinessDayMinus(days) => self
                .calendar
                .last_business_day_minus(days, year, month)?
                .ok_or_else(invalid_month),
            DayOfMonthPattern::NthWeekday { week, weekday } => {
                nth_weekday_of_month(year, month, weekday, week)
                    .or_else(|| last_weekday_of_month(year, month, weekday))
                    .ok_or_else(invalid_month)
            }
            DayOfMonthPattern::LastWeekday(weekday) => {
                last_weekday_of_month(year, month, weekday).ok_or_else(invalid_month)
            }
            DayOfMonthPattern::NthBusinessDay(n) => {
                match self.calendar.nth_business_day(n, year, month) {
                    Some(date) => Ok(date),
                    None => self.calendar.last_business_day(year, month),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::JapaneseNationalHolidayProvider;
    use chrono::Weekday;
    use std::sync::Arc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn japanese() -> BusinessDayCalendar {
        BusinessDayCalendar::new().with_provider(Arc::new(JapaneseNationalHolidayProvider::new()))
    }

    #[test]
    fn test_fixed_day_is_clamped() {
        let calendar = BusinessDayCalendar::new();
        let resolver = DayOfMonthResolver::new(&calendar);
        let pattern = DayOfMonthPattern::FixedDay(31);
        assert_eq!(resolver.resolve(2025, 2, Some(&pattern), 1).unwrap(), d(2025, 2, 28));
        assert_eq!(resolver.resolve(2024, 2, Some(&pattern), 1).unwrap(), d(2024, 2, 29));
        assert_eq!(resolver.resolve(2025, 4, None, 31).unwrap(), d(2025, 4, 30));
    }

    #[test]
    fn test_end_of_month() {
        let calendar = BusinessDayCalendar::new();
        let resolver = DayOfMonthResolver::new(&calendar);
        let pattern = DayOfMonthPattern::EndOfMonth;
        assert_eq!(resolver.resolve(2025, 2, Some(&pattern), 1).unwrap(), d(2025, 2, 28));
        assert_eq!(resolver.resolve(2025, 12, Some(&pattern), 1).unwrap(), d(2025, 12, 31));
    }

    #[test]
    fn test_business_day_patterns_use_holidays() {
        let calendar = japanese();
        let resolver = DayOfMonthResolver::new(&calendar);
        // 2025-01-01 is New Year's Day, Jan 2 is the first business day
        assert_eq!(
            resolver
                .resolve(2025, 1, Some(&DayOfMonthPattern::NthBusinessDay(1)), 1)
                .unwrap(),
            d(2025, 1, 2)
        );
        // 2025-11-30 is Sunday, Nov 28 is Friday
        assert_eq!(
            resolver
                .resolve(2025, 11, Some(&DayOfMonthPattern::LastBusinessDay), 1)
                .unwrap(),
            d(2025, 11, 28)
        );
        // Two business days before Nov 28, skipping the weekend
        assert_eq!(
            resolver
                .resolve(2025, 11, Some(&DayOfMonthPattern::LastBusinessDayMinus(2)), 1)
                .unwrap(),
            d(2025, 11, 26)
        );
    }

    #[test]
    fn test_weekday_patterns() {
        let calendar = BusinessDayCalendar::new();
        let resolver = DayOfMonthResolver::new(&calendar);
        let second_tuesday = DayOfMonthPattern::NthWeekday {
            week: 2,
            weekday: Weekday::Tue,
        };
        assert_eq!(
            resolver.resolve(2025, 3, Some(&second_tuesday), 1).unwrap(),
            d(2025, 3, 11)
        );
        let last_friday = DayOfMonthPattern::LastWeekday(Weekday::Fri);
        assert_eq!(
            resolver.resolve(2025, 10, Some(&last_friday), 1).unwrap(),
            d(2025, 10, 31)
        );
        // February 2025 has no fifth Monday
        let fifth_monday = DayOfMonthPattern::NthWeekday {
            week: 5,
            weekday: Weekday::Mon,
        };
        assert_eq!(
            resolver.resolve(2025, 2, Some(&fifth_monday), 1).unwrap(),
            d(2025, 2, 24)
        );
    }

    #[test]
    fn test_malformed_pattern_is_rejected() {
        let calendar = BusinessDayCalendar::new();
        let resolver = DayOfMonthResolver::new(&calendar);
        let pattern = DayOfMonthPattern::NthWeekday {
            week: 0,
            weekday: Weekday::Mon,
        };
        assert!(matches!(
            resolver.resolve(2025, 1, Some(&pattern), 1),
            Err(RecurringError::ValidationFailed(_))
        ));
    }
}
