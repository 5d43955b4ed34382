//! # Recurring Core
//!
//! A scheduling and reconciliation engine for recurring payments such as
//! rent, insurance premiums or yearly taxes.
//!
//! ## Features
//!
//! - **Business-day calendar**: Weekends plus pluggable holiday providers (Japanese national holidays, custom holidays)
//! - **Day-of-month patterns**: Fixed day, end of month, last business day, nth weekday, nth business day
//! - **Schedule generation**: Anchored month arithmetic with business-day adjustment and end dates
//! - **Reconciliation**: Diffing generated schedules against stored occurrences without touching completed ones
//! - **Saving balances**: Monthly accrual, payment processing and cached recalculation
//! - **Storage abstraction**: Database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//! use recurring_core::{
//!     BusinessDayCalendar, DayOfMonthPattern, JapaneseNationalHolidayProvider,
//!     RecurringPaymentDefinition, RecurringScheduleGenerator,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let calendar = BusinessDayCalendar::new()
//!     .with_provider(Arc::new(JapaneseNationalHolidayProvider::new()));
//!
//! let mut definition = RecurringPaymentDefinition::new(
//!     "car-tax".to_string(),
//!     "Car tax".to_string(),
//!     BigDecimal::from(45000),
//!     12,
//!     NaiveDate::from_ymd_opt(2025, 5, 31).ok_or("invalid date")?,
//! );
//! definition.day_of_month_pattern = Some(DayOfMonthPattern::LastBusinessDay);
//!
//! let reference = NaiveDate::from_ymd_opt(2025, 1, 1).ok_or("invalid date")?;
//! let targets = RecurringScheduleGenerator::new(&calendar).schedule_targets(
//!     &definition,
//!     definition.first_occurrence_date,
//!     reference,
//!     24,
//! )?;
//!
//! // 2025-05-31 is a Saturday
//! assert_eq!(
//!     Some(targets[0].scheduled_date),
//!     NaiveDate::from_ymd_opt(2025, 5, 30)
//! );
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod savings;
pub mod schedule;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use calendar::*;
pub use config::*;
pub use ledger::*;
pub use reconciliation::*;
pub use savings::*;
pub use schedule::*;
pub use traits::*;
pub use types::*;

pub use utils::logging::init_tracing;
pub use utils::memory_storage::MemoryStorage;
