//! Holiday providers: Japanese national holidays, user-defined holidays and their union

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::nth_weekday_of_month;
use crate::traits::{CustomHoliday, CustomHolidaySource, HolidayProvider};

const SUBSTITUTE_HOLIDAY: &str = "Substitute Holiday";
const CITIZENS_HOLIDAY: &str = "Citizens' Holiday";

/// Japanese national holidays
///
/// Covers the fixed-date holidays, the "Happy Monday" floating holidays,
/// the equinox days, the substitute-holiday rule (a holiday on Sunday makes
/// the next non-holiday date a holiday) and the citizens' holiday rule (a
/// day sandwiched between two holidays is a holiday).
#[derive(Debug, Clone, Copy, Default)]
pub struct JapaneseNationalHolidayProvider;

impl JapaneseNationalHolidayProvider {
    pub fn new() -> Self {
        Self
    }

    /// Holidays of a year with their English names
    pub fn named_holidays(&self, year: i32) -> BTreeMap<NaiveDate, &'static str> {
        let mut holidays = base_holidays(year);
        add_substitute_holidays(&mut holidays);
        add_citizens_holidays(&mut holidays);
        holidays
    }
}

impl HolidayProvider for JapaneseNationalHolidayProvider {
    fn holidays(&self, year: i32) -> BTreeSet<NaiveDate> {
        self.named_holidays(year).into_keys().collect()
    }
}

fn base_holidays(year: i32) -> BTreeMap<NaiveDate, &'static str> {
    let mut holidays = BTreeMap::new();
    let mut fixed = |month: u32, day: u32, name: &'static str| {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            holidays.insert(date, name);
        }
    };

    fixed(1, 1, "New Year's Day");
    fixed(2, 11, "National Foundation Day");
    if year >= 2020 {
        fixed(2, 23, "Emperor's Birthday");
    }
    fixed(4, 29, if year >= 2007 { "Showa Day" } else { "Greenery Day" });
    fixed(5, 3, "Constitution Memorial Day");
    fixed(5, 4, "Greenery Day");
    fixed(5, 5, "Children's Day");
    if year >= 2016 {
        fixed(8, 11, "Mountain Day");
    }
    fixed(11, 3, "Culture Day");
    fixed(11, 23, "Labour Thanksgiving Day");
    if year <= 2019 {
        fixed(12, 23, "Emperor's Birthday");
    }
    if year < 2000 {
        fixed(1, 15, "Coming of Age Day");
        fixed(10, 10, "Sports Day");
    }
    if (1996..2003).contains(&year) {
        fixed(7, 20, "Marine Day");
    }
    if year < 2003 {
        fixed(9, 15, "Respect for the Aged Day");
    }

    let mut floating = |month: u32, week: u32, name: &'static str| {
        if let Some(date) = nth_weekday_of_month(year, month, Weekday::Mon, week) {
            holidays.insert(date, name);
        }
    };
    if year >= 2000 {
        floating(1, 2, "Coming of Age Day");
        floating(10, 2, "Sports Day");
    }
    if year >= 2003 {
        floating(7, 3, "Marine Day");
        floating(9, 3, "Respect for the Aged Day");
    }

    if let Some(day) = vernal_equinox_day(year) {
        if let Some(date) = NaiveDate::from_ymd_opt(year, 3, day) {
            holidays.insert(date, "Vernal Equinox Day");
        }
    }
    if let Some(day) = autumnal_equinox_day(year) {
        if let Some(date) = NaiveDate::from_ymd_opt(year, 9, day) {
            holidays.insert(date, "Autumnal Equinox Day");
        }
    }

    holidays
}

// Standard approximation, valid for 1980..=2099.
fn equinox_day(year: i32, base: f64) -> Option<u32> {
    if !(1980..=2099).contains(&year) {
        return None;
    }
    let offset = (year - 1980) as f64;
    let leap_days = ((year - 1980) / 4) as f64;
    Some((base + 0.242194 * offset - leap_days).floor() as u32)
}

fn vernal_equinox_day(year: i32) -> Option<u32> {
    equinox_day(year, 20.8431)
}

fn autumnal_equinox_day(year: i32) -> Option<u32> {
    equinox_day(year, 23.2488)
}

fn add_substitute_holidays(holidays: &mut BTreeMap<NaiveDate, &'static str>) {
    let sundays: Vec<NaiveDate> = holidays
        .keys()
        .filter(|date| date.weekday() == Weekday::Sun)
        .copied()
        .collect();
    for sunday in sundays {
        let mut candidate = sunday.succ_opt();
        while let Some(date) = candidate {
            if !holidays.contains_key(&date) {
                holidays.insert(date, SUBSTITUTE_HOLIDAY);
                break;
            }
            candidate = date.succ_opt();
        }
    }
}

fn add_citizens_holidays(holidays: &mut BTreeMap<NaiveDate, &'static str>) {
    let sandwiched: Vec<NaiveDate> = holidays
        .keys()
        .filter_map(|date| {
            let middle = date.succ_opt()?;
            let after = middle.succ_opt()?;
            let qualifies = !holidays.contains_key(&middle)
                && holidays.contains_key(&after)
                && middle.weekday() != Weekday::Sun;
            qualifies.then_some(middle)
        })
        .collect();
    for date in sandwiched {
        holidays.insert(date, CITIZENS_HOLIDAY);
    }
}

/// Holidays defined by the user, optionally repeating every year
#[derive(Debug, Clone, Default)]
pub struct CustomHolidayProvider {
    records: Vec<CustomHoliday>,
}

impl CustomHolidayProvider {
    pub fn new(records: Vec<CustomHoliday>) -> Self {
        Self { records }
    }

    /// Load every record from a holiday source
    pub fn from_source(source: &dyn CustomHolidaySource) -> Self {
        Self::new(source.custom_holidays())
    }

    /// Name of the custom holiday falling on `date`
    pub fn name_of(&self, date: NaiveDate) -> Option<&str> {
        self.records
            .iter()
            .find(|record| project(record, date.year()) == Some(date))
            .map(|record| record.name.as_str())
    }

    pub fn records(&self) -> &[CustomHoliday] {
        &self.records
    }
}

// Date of a record in the given year, `None` when it does not apply.
// A recurring Feb 29 does not occur in non-leap years.
fn project(record: &CustomHoliday, year: i32) -> Option<NaiveDate> {
    if record.is_recurring {
        NaiveDate::from_ymd_opt(year, record.date.month(), record.date.day())
    } else {
        (record.date.year() == year).then_some(record.date)
    }
}

impl HolidayProvider for CustomHolidayProvider {
    fn holidays(&self, year: i32) -> BTreeSet<NaiveDate> {
        self.records
            .iter()
            .filter_map(|record| project(record, year))
            .collect()
    }

    fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> BTreeSet<NaiveDate> {
        if from > to {
            return BTreeSet::new();
        }
        let mut holidays = BTreeSet::new();
        for record in &self.records {
            if record.is_recurring {
                holidays.extend(
                    (from.year()..=to.year()).filter_map(|year| project(record, year)),
                );
            } else {
                holidays.insert(record.date);
            }
        }
        holidays.retain(|date| *date >= from && *date <= to);
        holidays
    }
}

/// Union of several providers
#[derive(Clone, Default)]
pub struct CompositeHolidayProvider {
    providers: Vec<Arc<dyn HolidayProvider>>,
}

impl CompositeHolidayProvider {
    pub fn new(providers: Vec<Arc<dyn HolidayProvider>>) -> Self {
        Self { providers }
    }

    pub fn push(&mut self, provider: Arc<dyn HolidayProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for CompositeHolidayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeHolidayProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl HolidayProvider for CompositeHolidayProvider {
    fn holidays(&self, year: i32) -> BTreeSet<NaiveDate> {
        self.providers
            .iter()
            .flat_map(|provider| provider.holidays(year))
            .collect()
    }

    fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> BTreeSet<NaiveDate> {
        self.providers
            .iter()
            .flat_map(|provider| provider.holidays_between(from, to))
            .collect()
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.providers.iter().any(|provider| provider.is_holiday(date))
    }
}
