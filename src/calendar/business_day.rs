//! Business-day predicate and navigation over a composed holiday calendar

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::{days_in_month, end_of_month, is_weekend};
use crate::traits::HolidayProvider;
use crate::types::*;

/// Default number of days a business-day walk may cover before giving up
pub const DEFAULT_BUSINESS_DAY_SEARCH_LIMIT: u32 = 3650;

/// Weekday and holiday aware calendar
///
/// A date is a business day when it is a weekday and neither the explicit
/// holiday set nor any configured provider marks it as a holiday. The
/// calendar holds no mutable state and can be shared between threads.
#[derive(Clone)]
pub struct BusinessDayCalendar {
    holidays: BTreeSet<NaiveDate>,
    providers: Vec<Arc<dyn HolidayProvider>>,
    search_limit: u32,
}

impl fmt::Debug for BusinessDayCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusinessDayCalendar")
            .field("holidays", &self.holidays)
            .field("providers", &self.providers.len())
            .field("search_limit", &self.search_limit)
            .finish()
    }
}

impl Default for BusinessDayCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl BusinessDayCalendar {
    /// Calendar where only weekends are non-business days
    pub fn new() -> Self {
        Self {
            holidays: BTreeSet::new(),
            providers: Vec::new(),
            search_limit: DEFAULT_BUSINESS_DAY_SEARCH_LIMIT,
        }
    }

    /// Add explicit holiday dates
    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    /// Add a holiday provider
    pub fn with_provider(mut self, provider: Arc<dyn HolidayProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Override how many days `next_business_day`/`previous_business_day` may walk
    pub fn with_search_limit(mut self, search_limit: u32) -> Self {
        self.search_limit = search_limit.max(1);
        self
    }

    /// Whether the date is a configured holiday
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date) || self.providers.iter().any(|p| p.is_holiday(date))
    }

    /// Every holiday known to the calendar in `from..=to`
    pub fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> BTreeSet<NaiveDate> {
        let mut all: BTreeSet<NaiveDate> = self.holidays.range(from..=to).copied().collect();
        for provider in &self.providers {
            all.extend(provider.holidays_between(from, to));
        }
        all
    }

    /// A weekday that is not a holiday
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }

    /// First business day strictly after `date`
    pub fn next_business_day(&self, date: NaiveDate) -> RecurringResult<NaiveDate> {
        self.walk(date, 1)
    }

    /// Last business day strictly before `date`
    pub fn previous_business_day(&self, date: NaiveDate) -> RecurringResult<NaiveDate> {
        self.walk(date, -1)
    }

    fn walk(&self, from: NaiveDate, direction: i64) -> RecurringResult<NaiveDate> {
        let exhausted = RecurringError::BusinessDaySearchExhausted {
            from,
            limit: self.search_limit,
        };
        let mut current = from;
        for _ in 0..self.search_limit {
            let step = if direction > 0 {
                current.succ_opt()
            } else {
                current.pred_opt()
            };
            current = step.ok_or_else(|| exhausted.clone())?;
            if self.is_business_day(current) {
                return Ok(current);
            }
        }
        warn!(%from, limit = self.search_limit, "business day search exhausted");
        Err(exhausted)
    }

    /// Day 1 of the month, moved forward if it is not a business day
    pub fn first_business_day(&self, year: i32, month: u32) -> RecurringResult<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            RecurringError::validation(format!("Invalid month {}-{:02}", year, month))
        })?;
        if self.is_business_day(first) {
            Ok(first)
        } else {
            self.next_business_day(first)
        }
    }

    /// Last calendar day of the month, moved backward if it is not a business day
    pub fn last_business_day(&self, year: i32, month: u32) -> RecurringResult<NaiveDate> {
        let last = end_of_month(year, month).ok_or_else(|| {
            RecurringError::validation(format!("Invalid month {}-{:02}", year, month))
        })?;
        if self.is_business_day(last) {
            Ok(last)
        } else {
            self.previous_business_day(last)
        }
    }

    /// The `n`-th business day of the month, `None` when `n <= 0` or the month is too short
    pub fn nth_business_day(&self, n: i32, year: i32, month: u32) -> Option<NaiveDate> {
        if n <= 0 {
            return None;
        }
        (1..=days_in_month(year, month))
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .filter(|date| self.is_business_day(*date))
            .nth(n as usize - 1)
    }

    /// Step back `days` business days from the last business day of the month
    ///
    /// Returns `Ok(None)` for a negative `days`.
    pub fn last_business_day_minus(
        &self,
        days: i32,
        year: i32,
        month: u32,
    ) -> RecurringResult<Option<NaiveDate>> {
        if days < 0 {
            return Ok(None);
        }
        let mut date = self.last_business_day(year, month)?;
        for _ in 0..days {
            date = self.previous_business_day(date)?;
        }
        Ok(Some(date))
    }

    /// Number of business days in a month
    pub fn business_days_in_month(&self, year: i32, month: u32) -> usize {
        (1..=days_in_month(year, month))
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .filter(|date| self.is_business_day(*date))
            .count()
    }

    /// Apply a date adjustment policy to a resolved date
    pub fn adjust(
        &self,
        date: NaiveDate,
        policy: DateAdjustmentPolicy,
    ) -> RecurringResult<NaiveDate> {
        if self.is_business_day(date) {
            return Ok(date);
        }
        match policy {
            DateAdjustmentPolicy::None => Ok(date),
            DateAdjustmentPolicy::MoveToPreviousBusinessDay => self.previous_business_day(date),
            DateAdjustmentPolicy::MoveToNextBusinessDay => self.next_business_day(date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    struct EveryDayHoliday;

    impl HolidayProvider for EveryDayHoliday {
        fn holidays(&self, year: i32) -> BTreeSet<NaiveDate> {
            d(year, 1, 1).iter_days().take_while(|x| x.year() == year).collect()
        }

        fn is_holiday(&self, _date: NaiveDate) -> bool {
            true
        }
    }

    #[test]
    fn test_weekends_are_not_business_days() {
        let calendar = BusinessDayCalendar::new();
        assert!(calendar.is_business_day(d(2025, 1, 31))); // Friday
        assert!(!calendar.is_business_day(d(2025, 2, 1))); // Saturday
        assert!(!calendar.is_business_day(d(2025, 2, 2))); // Sunday
    }

    #[test]
    fn test_explicit_holidays() {
        let calendar = BusinessDayCalendar::new().with_holidays([d(2025, 1, 31)]);
        assert!(!calendar.is_business_day(d(2025, 1, 31)));
        assert_eq!(calendar.previous_business_day(d(2025, 2, 1)).unwrap(), d(2025, 1, 30));
    }

    #[test]
    fn test_navigation_skips_weekends() {
        let calendar = BusinessDayCalendar::new();
        assert_eq!(calendar.next_business_day(d(2025, 1, 31)).unwrap(), d(2025, 2, 3));
        assert_eq!(calendar.previous_business_day(d(2025, 2, 3)).unwrap(), d(2025, 1, 31));
        assert_eq!(calendar.first_business_day(2025, 2).unwrap(), d(2025, 2, 3));
        assert_eq!(calendar.last_business_day(2025, 5).unwrap(), d(2025, 5, 30));
    }

    #[test]
    fn test_nth_business_day() {
        let calendar = BusinessDayCalendar::new();
        assert_eq!(calendar.nth_business_day(1, 2025, 2), Some(d(2025, 2, 3)));
        assert_eq!(calendar.nth_business_day(5, 2025, 2), Some(d(2025, 2, 7)));
        assert_eq!(calendar.nth_business_day(0, 2025, 2), None);
        assert_eq!(calendar.nth_business_day(-3, 2025, 2), None);
        assert_eq!(calendar.business_days_in_month(2025, 2), 20);
        assert_eq!(calendar.nth_business_day(21, 2025, 2), None);
    }

    #[test]
    fn test_last_business_day_minus() {
        let calendar = BusinessDayCalendar::new();
        // 2025-05-30 is a Friday
        assert_eq!(
            calendar.last_business_day_minus(0, 2025, 5).unwrap(),
            Some(d(2025, 5, 30))
        );
        assert_eq!(
            calendar.last_business_day_minus(5, 2025, 5).unwrap(),
            Some(d(2025, 5, 23))
        );
        assert_eq!(calendar.last_business_day_minus(-1, 2025, 5).unwrap(), None);
    }

    #[test]
    fn test_adjustment_policies() {
        let calendar = BusinessDayCalendar::new();
        let saturday = d(2025, 2, 1);
        assert_eq!(
            calendar
                .adjust(saturday, DateAdjustmentPolicy::MoveToPreviousBusinessDay)
                .unwrap(),
            d(2025, 1, 31)
        );
        assert_eq!(
            calendar
                .adjust(saturday, DateAdjustmentPolicy::MoveToNextBusinessDay)
                .unwrap(),
            d(2025, 2, 3)
        );
        assert_eq!(
            calendar.adjust(saturday, DateAdjustmentPolicy::None).unwrap(),
            saturday
        );
    }

    #[test]
    fn test_search_is_bounded() {
        let calendar = BusinessDayCalendar::new()
            .with_provider(Arc::new(EveryDayHoliday))
            .with_search_limit(40);
        let err = calendar.next_business_day(d(2025, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            RecurringError::BusinessDaySearchExhausted {
                from: d(2025, 1, 1),
                limit: 40
            }
        );
        assert!(calendar.last_business_day(2025, 3).is_err());
    }
}
