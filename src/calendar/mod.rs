//! Calendar arithmetic, holiday providers and business-day navigation

pub mod business_day;
pub mod day_of_month;
pub mod holidays;

pub use business_day::*;
pub use day_of_month::*;
pub use holidays::*;

use chrono::{Datelike, NaiveDate, Weekday};

/// First calendar year schedules may reach
pub const MIN_SUPPORTED_YEAR: i32 = 1;
/// Last calendar year schedules may reach
pub const MAX_SUPPORTED_YEAR: i32 = 9999;

/// Number of days in a month, accounting for leap years
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// `day` of the month, clamped to the month's last day
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Last calendar day of the month
pub fn end_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))
}

/// Zero-based running month number, `year * 12 + month - 1`
pub fn month_index(year: i32, month: u32) -> i64 {
    year as i64 * 12 + month as i64 - 1
}

/// Inverse of [`month_index`]
pub fn year_month_from_index(index: i64) -> (i32, u32) {
    (index.div_euclid(12) as i32, (index.rem_euclid(12) + 1) as u32)
}

/// Shift a `(year, month)` pair by a signed number of months
pub fn add_months(year: i32, month: u32, months: i64) -> (i32, u32) {
    year_month_from_index(month_index(year, month) + months)
}

/// Like [`add_months`], but `None` when the result leaves the supported years
pub fn checked_add_months(year: i32, month: u32, months: i64) -> Option<(i32, u32)> {
    let index = month_index(year, month).checked_add(months)?;
    let supported = month_index(MIN_SUPPORTED_YEAR, 1)..=month_index(MAX_SUPPORTED_YEAR, 12);
    supported
        .contains(&index)
        .then(|| year_month_from_index(index))
}

/// Whole calendar months from `from`'s month to `to`'s month, ignoring days
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    month_index(to.year(), to.month()) - month_index(from.year(), from.month())
}

/// `date` moved by `months` calendar months with the day clamped to the target month
pub fn shift_date_by_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let (year, month) = checked_add_months(date.year(), date.month(), months)?;
    clamped_date(year, month, date.day())
}

/// The `n`-th (1-based) occurrence of `weekday` in a month, if the month has one
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    if !(1..=5).contains(&n) {
        return None;
    }
    let date = NaiveDate::from_weekday_of_month_opt(year, month, weekday, u8::try_from(n).ok()?)?;
    (date.month() == month).then_some(date)
}

/// The last occurrence of `weekday` in a month
pub fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let last = end_of_month(year, month)?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    last.checked_sub_days(chrono::Days::new(back as u64))
}

/// Whether the date falls on Saturday or Sunday
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
