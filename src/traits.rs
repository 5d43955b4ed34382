//! Traits for storage abstraction, holiday sources and validation

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::*;
use crate::utils::validation;

/// Source of holidays consumed by the business-day calendar
pub trait HolidayProvider: Send + Sync {
    /// All holidays of a calendar year
    fn holidays(&self, year: i32) -> BTreeSet<NaiveDate>;

    /// All holidays in the inclusive range `from..=to`
    fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> BTreeSet<NaiveDate> {
        if from > to {
            return BTreeSet::new();
        }
        (from.year()..=to.year())
            .flat_map(|year| self.holidays(year))
            .filter(|date| *date >= from && *date <= to)
            .collect()
    }

    /// Whether a single date is a holiday
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays(date.year()).contains(&date)
    }
}

/// User-defined holiday record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHoliday {
    /// Date of the holiday. Only month and day matter for recurring records
    pub date: NaiveDate,
    /// Display name
    pub name: String,
    /// Whether the holiday repeats every year
    pub is_recurring: bool,
}

impl CustomHoliday {
    /// Create a new custom holiday record
    pub fn new(date: NaiveDate, name: String, is_recurring: bool) -> Self {
        Self {
            date,
            name,
            is_recurring,
        }
    }
}

/// Supplier of user-defined holiday records
pub trait CustomHolidaySource: Send + Sync {
    /// All stored custom holiday records
    fn custom_holidays(&self) -> Vec<CustomHoliday>;
}

/// Storage abstraction for recurring payments
///
/// The scheduling engine itself never touches storage; the orchestration
/// layer loads snapshots through this trait, runs the pure functions and
/// writes the results back.
#[async_trait]
pub trait RecurringPaymentStorage: Send + Sync {
    /// Save a new definition
    async fn save_definition(&mut self, definition: &RecurringPaymentDefinition)
        -> RecurringResult<()>;

    /// Get a definition by ID
    async fn get_definition(
        &self,
        definition_id: &str,
    ) -> RecurringResult<Option<RecurringPaymentDefinition>>;

    /// List all definitions, optionally filtered by category
    async fn list_definitions(
        &self,
        category_id: Option<&str>,
    ) -> RecurringResult<Vec<RecurringPaymentDefinition>>;

    /// Update an existing definition
    async fn update_definition(
        &mut self,
        definition: &RecurringPaymentDefinition,
    ) -> RecurringResult<()>;

    /// Delete a definition
    async fn delete_definition(&mut self, definition_id: &str) -> RecurringResult<()>;

    /// Save a new occurrence
    async fn save_occurrence(&mut self, occurrence: &Occurrence) -> RecurringResult<()>;

    /// Get an occurrence by ID
    async fn get_occurrence(&self, occurrence_id: &str) -> RecurringResult<Option<Occurrence>>;

    /// List the occurrences of a definition
    async fn list_occurrences(&self, definition_id: &str) -> RecurringResult<Vec<Occurrence>>;

    /// Update an existing occurrence
    async fn update_occurrence(&mut self, occurrence: &Occurrence) -> RecurringResult<()>;

    /// Delete an occurrence
    async fn delete_occurrence(&mut self, occurrence_id: &str) -> RecurringResult<()>;

    /// Get the saving balance of a definition
    async fn get_balance(&self, definition_id: &str) -> RecurringResult<Option<SavingBalance>>;

    /// Insert or replace the saving balance of a definition
    async fn save_balance(&mut self, balance: &SavingBalance) -> RecurringResult<()>;

    /// Delete the saving balance of a definition
    async fn delete_balance(&mut self, definition_id: &str) -> RecurringResult<()>;

    /// Whether a category exists
    async fn category_exists(&self, category_id: &str) -> RecurringResult<bool>;
}

/// Trait for implementing custom definition validation rules
pub trait DefinitionValidator: Send + Sync {
    /// Validate a definition before saving
    fn validate_definition(&self, definition: &RecurringPaymentDefinition)
        -> RecurringResult<()>;
}

/// Default definition validator, reports every violated rule at once
pub struct DefaultDefinitionValidator;

impl DefinitionValidator for DefaultDefinitionValidator {
    fn validate_definition(&self, definition: &RecurringPaymentDefinition) -> RecurringResult<()> {
        let reasons = validation::definition_violations(definition);
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(RecurringError::ValidationFailed(reasons))
        }
    }
}
