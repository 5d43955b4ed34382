//! Core types and data structures for recurring payment scheduling

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Rule selecting which day inside a target month an occurrence lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfMonthPattern {
    /// A fixed calendar day, clamped to the month length (31 in February -> 28/29)
    FixedDay(u32),
    /// The last calendar day of the month
    EndOfMonth,
    /// The last business day of the month
    LastBusinessDay,
    /// N business days before the last business day of the month
    LastBusinessDayMinus(i32),
    /// The `week`-th occurrence of `weekday` in the month (1..=5)
    NthWeekday { week: u32, weekday: Weekday },
    /// The last occurrence of a weekday in the month
    LastWeekday(Weekday),
    /// The n-th business day counted from the first of the month
    NthBusinessDay(i32),
}

/// What to do when a resolved date is not a business day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DateAdjustmentPolicy {
    /// Keep the resolved date even if it is a weekend or holiday
    #[default]
    None,
    /// Move back to the closest earlier business day
    MoveToPreviousBusinessDay,
    /// Move forward to the closest later business day
    MoveToNextBusinessDay,
}

/// How money is put aside ahead of a recurring payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SavingStrategy {
    /// No monthly saving
    #[default]
    Disabled,
    /// `amount / recurrence_interval_months` every month
    EvenlyDistributed,
    /// A user supplied monthly amount
    Custom,
}

/// A recurring payment such as "car tax, 45,000 every 12 months"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringPaymentDefinition {
    /// Unique identifier for the definition
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Amount expected on every occurrence
    pub amount: BigDecimal,
    /// Months between two occurrences, must be positive
    pub recurrence_interval_months: i32,
    /// Date of the first occurrence, anchors the whole sequence
    pub first_occurrence_date: NaiveDate,
    /// Optional last possible occurrence date
    pub end_date: Option<NaiveDate>,
    /// Months before the scheduled date during which the occurrence is in `Saving`
    pub lead_time_months: i32,
    /// Day selection rule, `None` reuses the day of `first_occurrence_date`
    pub day_of_month_pattern: Option<DayOfMonthPattern>,
    /// Business-day adjustment applied after the day pattern
    pub date_adjustment_policy: DateAdjustmentPolicy,
    /// Monthly saving strategy
    pub saving_strategy: SavingStrategy,
    /// Monthly amount used by [`SavingStrategy::Custom`]
    pub custom_monthly_saving_amount: Option<BigDecimal>,
    /// Optional category foreign key, resolved by the storage layer
    pub category_id: Option<String>,
    /// Monotonic change counter, bumped on every mutation
    pub version: u64,
}

impl RecurringPaymentDefinition {
    /// Create a definition with default pattern, policy and saving strategy
    pub fn new(
        id: String,
        name: String,
        amount: BigDecimal,
        recurrence_interval_months: i32,
        first_occurrence_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            name,
            amount,
            recurrence_interval_months,
            first_occurrence_date,
            end_date: None,
            lead_time_months: 0,
            day_of_month_pattern: None,
            date_adjustment_policy: DateAdjustmentPolicy::None,
            saving_strategy: SavingStrategy::Disabled,
            custom_monthly_saving_amount: None,
            category_id: None,
            version: 0,
        }
    }

    /// Record a mutation
    pub fn touch(&mut self) {
        self.version += 1;
    }
}

/// Lifecycle state of an occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccurrenceStatus {
    /// Scheduled, outside the lead-time window
    Planned,
    /// Inside the lead-time window, money is being put aside
    Saving,
    /// Paid. Locked: the scheduling engine never touches it again
    Completed,
    /// Manually cancelled
    Cancelled,
    /// Manually skipped
    Skipped,
}

impl OccurrenceStatus {
    /// Whether the occurrence is locked against regeneration
    pub fn is_locked(&self) -> bool {
        matches!(self, OccurrenceStatus::Completed)
    }

    /// Manual statuses that synchronization leaves alone
    pub fn is_manual(&self) -> bool {
        matches!(self, OccurrenceStatus::Cancelled | OccurrenceStatus::Skipped)
    }
}

/// One concrete scheduled instance of a recurring payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Unique identifier for the occurrence
    pub id: String,
    /// Owning definition
    pub definition_id: String,
    /// Date the payment is due
    pub scheduled_date: NaiveDate,
    /// Amount expected on that date
    pub expected_amount: BigDecimal,
    /// Current lifecycle state
    pub status: OccurrenceStatus,
    /// Date the payment actually happened
    pub actual_date: Option<NaiveDate>,
    /// Amount actually paid
    pub actual_amount: Option<BigDecimal>,
    /// Linked transaction foreign key
    pub transaction_id: Option<String>,
}

impl Occurrence {
    /// Create a new, unpaid occurrence
    pub fn new(
        id: String,
        definition_id: String,
        scheduled_date: NaiveDate,
        expected_amount: BigDecimal,
        status: OccurrenceStatus,
    ) -> Self {
        Self {
            id,
            definition_id,
            scheduled_date,
            expected_amount,
            status,
            actual_date: None,
            actual_amount: None,
            transaction_id: None,
        }
    }

    /// Whether the occurrence is locked against regeneration
    pub fn is_locked(&self) -> bool {
        self.status.is_locked()
    }
}

/// Savings set aside and payments made for one definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingBalance {
    /// Unique identifier for the balance
    pub id: String,
    /// Owning definition
    pub definition_id: String,
    /// Sum of all monthly savings
    pub total_saved_amount: BigDecimal,
    /// Sum of all actual payments
    pub total_paid_amount: BigDecimal,
    /// Year of the last recorded saving month
    pub last_updated_year: i32,
    /// Month (1..=12) of the last recorded saving month
    pub last_updated_month: u32,
    /// Monotonic change counter, bumped on every mutation
    pub version: u64,
}

impl SavingBalance {
    /// Create an empty balance
    pub fn new(id: String, definition_id: String, year: i32, month: u32) -> Self {
        Self {
            id,
            definition_id,
            total_saved_amount: BigDecimal::from(0),
            total_paid_amount: BigDecimal::from(0),
            last_updated_year: year,
            last_updated_month: month,
            version: 0,
        }
    }

    /// Saved minus paid. Negative when overdrawn
    pub fn balance(&self) -> BigDecimal {
        &self.total_saved_amount - &self.total_paid_amount
    }

    /// Record a mutation
    pub fn touch(&mut self) {
        self.version += 1;
    }
}

/// A generated `(date, amount)` pair before it becomes an occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTarget {
    pub scheduled_date: NaiveDate,
    pub expected_amount: BigDecimal,
}

/// Result of diffing generated targets against persisted occurrences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynchronizationPlan {
    /// Completed occurrences, kept untouched
    pub locked: Vec<Occurrence>,
    /// New occurrences to persist
    pub created: Vec<Occurrence>,
    /// Existing occurrences whose amount or status changed
    pub updated: Vec<Occurrence>,
    /// Existing occurrences to delete
    pub removed: Vec<Occurrence>,
    /// Resulting occurrence set, sorted by scheduled date
    pub occurrences: Vec<Occurrence>,
}

impl SynchronizationPlan {
    /// Whether applying the plan would change nothing
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Classification of an actual payment against its expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentDifferenceType {
    Exact,
    Overpaid,
    Underpaid,
}

/// Expected versus actual amount of a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDifference {
    pub expected: BigDecimal,
    pub actual: BigDecimal,
    /// `actual - expected`
    pub difference: BigDecimal,
    pub difference_type: PaymentDifferenceType,
}

impl PaymentDifference {
    /// Compare an actual amount against the expected one
    pub fn between(expected: BigDecimal, actual: BigDecimal) -> Self {
        let difference = &actual - &expected;
        let zero = BigDecimal::from(0);
        let difference_type = if difference == zero {
            PaymentDifferenceType::Exact
        } else if difference > zero {
            PaymentDifferenceType::Overpaid
        } else {
            PaymentDifferenceType::Underpaid
        };
        Self {
            expected,
            actual,
            difference,
            difference_type,
        }
    }
}

/// Errors that can occur in the scheduling engine and around it
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecurringError {
    #[error("Invalid recurrence interval: {0} months (must be positive)")]
    InvalidRecurrence(i32),
    #[error("Invalid horizon: {0} months (must not be negative)")]
    InvalidHorizon(i32),
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
    #[error("Recurring payment definition not found: {0}")]
    DefinitionNotFound(String),
    #[error("Occurrence not found: {0}")]
    OccurrenceNotFound(String),
    #[error("Category not found: {0}")]
    CategoryNotFound(String),
    #[error("Definition '{definition_id}' has more than one occurrence on {date}")]
    DuplicateOccurrenceDate {
        definition_id: String,
        date: NaiveDate,
    },
    #[error("No business day found within {limit} days of {from}")]
    BusinessDaySearchExhausted { from: NaiveDate, limit: u32 },
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RecurringError {
    /// Single-reason validation failure
    pub fn validation(reason: impl Into<String>) -> Self {
        RecurringError::ValidationFailed(vec![reason.into()])
    }

    /// Human readable reasons of a validation failure, empty for other kinds
    pub fn reasons(&self) -> &[String] {
        match self {
            RecurringError::ValidationFailed(reasons) => reasons,
            _ => &[],
        }
    }
}

/// Result type for recurring payment operations
pub type RecurringResult<T> = Result<T, RecurringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_can_go_negative() {
        let mut balance = SavingBalance::new("b1".to_string(), "d1".to_string(), 2025, 1);
        balance.total_saved_amount = BigDecimal::from(1000);
        balance.total_paid_amount = BigDecimal::from(1500);
        assert_eq!(balance.balance(), BigDecimal::from(-500));
    }

    #[test]
    fn test_payment_difference_classification() {
        let over = PaymentDifference::between(BigDecimal::from(45000), BigDecimal::from(50000));
        assert_eq!(over.difference, BigDecimal::from(5000));
        assert_eq!(over.difference_type, PaymentDifferenceType::Overpaid);

        let under = PaymentDifference::between(BigDecimal::from(45000), BigDecimal::from(40000));
        assert_eq!(under.difference, BigDecimal::from(-5000));
        assert_eq!(under.difference_type, PaymentDifferenceType::Underpaid);

        let exact = PaymentDifference::between(BigDecimal::from(100), BigDecimal::from(100));
        assert_eq!(exact.difference_type, PaymentDifferenceType::Exact);
    }

    #[test]
    fn test_validation_failed_message_joins_reasons() {
        let err = RecurringError::ValidationFailed(vec![
            "Name cannot be empty".to_string(),
            "Amount cannot be negative".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: Name cannot be empty; Amount cannot be negative"
        );
        assert_eq!(err.reasons().len(), 2);
    }

    #[test]
    fn test_only_completed_is_locked() {
        assert!(OccurrenceStatus::Completed.is_locked());
        assert!(!OccurrenceStatus::Planned.is_locked());
        assert!(!OccurrenceStatus::Cancelled.is_locked());
        assert!(OccurrenceStatus::Skipped.is_manual());
    }
}
