//! Validation utilities

use bigdecimal::BigDecimal;

use crate::calendar::{MAX_SUPPORTED_YEAR, MIN_SUPPORTED_YEAR};
use crate::types::*;

/// Most business days any month can have
const MAX_BUSINESS_DAYS_IN_MONTH: i32 = 23;

/// Validate that an amount is not negative
pub fn validate_non_negative_amount(amount: &BigDecimal) -> RecurringResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(RecurringError::validation("Amount cannot be negative"))
    } else {
        Ok(())
    }
}

/// Validate that a definition ID is valid
pub fn validate_definition_id(definition_id: &str) -> RecurringResult<()> {
    if definition_id.trim().is_empty() {
        return Err(RecurringError::validation("Definition ID cannot be empty"));
    }

    if definition_id.len() > 50 {
        return Err(RecurringError::validation(
            "Definition ID cannot exceed 50 characters",
        ));
    }

    // Check for valid characters (alphanumeric, dashes, underscores)
    if !definition_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(RecurringError::validation(
            "Definition ID can only contain alphanumeric characters, dashes, and underscores",
        ));
    }

    Ok(())
}

/// Validate that a definition name is valid
pub fn validate_definition_name(name: &str) -> RecurringResult<()> {
    if name.trim().is_empty() {
        return Err(RecurringError::validation("Name cannot be empty"));
    }

    if name.len() > 100 {
        return Err(RecurringError::validation(
            "Name cannot exceed 100 characters",
        ));
    }

    Ok(())
}

/// Validate a `(year, month)` pair
pub fn validate_year_month(year: i32, month: u32) -> RecurringResult<()> {
    if !(1..=12).contains(&month) {
        return Err(RecurringError::validation(format!(
            "Month must be between 1 and 12, got {}",
            month
        )));
    }
    if !(MIN_SUPPORTED_YEAR..=MAX_SUPPORTED_YEAR).contains(&year) {
        return Err(RecurringError::validation(format!(
            "Year must be between {} and {}, got {}",
            MIN_SUPPORTED_YEAR, MAX_SUPPORTED_YEAR, year
        )));
    }
    Ok(())
}

/// Problems with a day-of-month pattern, empty when the pattern is valid
pub fn pattern_violations(pattern: &DayOfMonthPattern) -> Vec<String> {
    let mut reasons = Vec::new();
    match *pattern {
        DayOfMonthPattern::FixedDay(day) if !(1..=31).contains(&day) => {
            reasons.push(format!("Day of month must be between 1 and 31, got {}", day));
        }
        DayOfMonthPattern::NthWeekday { week, .. } if !(1..=5).contains(&week) => {
            reasons.push(format!("Week of month must be between 1 and 5, got {}", week));
        }
        DayOfMonthPattern::NthBusinessDay(n) if !(1..=MAX_BUSINESS_DAYS_IN_MONTH).contains(&n) => {
            reasons.push(format!(
                "Business day of month must be between 1 and {}, got {}",
                MAX_BUSINESS_DAYS_IN_MONTH, n
            ));
        }
        DayOfMonthPattern::LastBusinessDayMinus(days) if days < 0 => {
            reasons.push(format!(
                "Business days before month end cannot be negative, got {}",
                days
            ));
        }
        _ => {}
    }
    reasons
}

/// Every violated rule of a definition, in a stable order
pub fn definition_violations(definition: &RecurringPaymentDefinition) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Err(err) = validate_definition_id(&definition.id) {
        reasons.extend(err.reasons().iter().cloned());
    }
    if let Err(err) = validate_definition_name(&definition.name) {
        reasons.extend(err.reasons().iter().cloned());
    }
    if let Err(err) = validate_non_negative_amount(&definition.amount) {
        reasons.extend(err.reasons().iter().cloned());
    }
    if definition.recurrence_interval_months <= 0 {
        reasons.push(format!(
            "Recurrence interval must be at least 1 month, got {}",
            definition.recurrence_interval_months
        ));
    }
    if definition.lead_time_months < 0 {
        reasons.push(format!(
            "Lead time cannot be negative, got {} months",
            definition.lead_time_months
        ));
    }
    if let Some(end_date) = definition.end_date {
        if end_date < definition.first_occurrence_date {
            reasons.push(format!(
                "End date {} is before the first occurrence date {}",
                end_date, definition.first_occurrence_date
            ));
        }
    }
    if let Some(pattern) = &definition.day_of_month_pattern {
        reasons.extend(pattern_violations(pattern));
    }
    if definition.saving_strategy == SavingStrategy::Custom {
        match &definition.custom_monthly_saving_amount {
            None => reasons.push("Custom saving strategy requires a monthly amount".to_string()),
            Some(amount) if *amount < BigDecimal::from(0) => {
                reasons.push("Custom monthly saving amount cannot be negative".to_string())
            }
            Some(_) => {}
        }
    }

    reasons
}
