//! Monthly saving accrual, payment processing and balance recalculation

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::cache::{BalanceCache, BalanceCacheKey, BalanceSnapshot, CacheStats};
use crate::calendar::month_index;
use crate::types::*;
use crate::utils::validation::validate_year_month;

/// Target and start month of a full balance recalculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalancePeriod {
    pub year: i32,
    pub month: u32,
    pub start_year: i32,
    pub start_month: u32,
}

impl BalancePeriod {
    pub fn new(year: i32, month: u32, start_year: i32, start_month: u32) -> Self {
        Self {
            year,
            month,
            start_year,
            start_month,
        }
    }

    /// Months from the start month to the target month, inclusive; zero if the target is earlier
    pub fn elapsed_months(&self) -> u32 {
        let elapsed =
            month_index(self.year, self.month) - month_index(self.start_year, self.start_month) + 1;
        elapsed.max(0) as u32
    }

    fn validate(&self) -> RecurringResult<()> {
        validate_year_month(self.year, self.month)?;
        validate_year_month(self.start_year, self.start_month)
    }
}

/// Amount put aside every month for a definition
pub fn monthly_allocation(definition: &RecurringPaymentDefinition) -> BigDecimal {
    match definition.saving_strategy {
        SavingStrategy::Disabled => BigDecimal::from(0),
        SavingStrategy::EvenlyDistributed if definition.recurrence_interval_months > 0 => {
            &definition.amount / BigDecimal::from(definition.recurrence_interval_months)
        }
        SavingStrategy::EvenlyDistributed => BigDecimal::from(0),
        SavingStrategy::Custom => definition
            .custom_monthly_saving_amount
            .clone()
            .unwrap_or_else(|| BigDecimal::from(0)),
    }
}

/// Tracks saving balances; full recalculations are cached
#[derive(Debug, Default)]
pub struct SavingBalanceCalculator {
    cache: BalanceCache,
}

impl SavingBalanceCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one month of savings to a balance
    ///
    /// Creates the balance when there is none. A month at or before the
    /// balance's last recorded month leaves it unchanged.
    pub fn record_monthly_savings(
        &self,
        definition: &RecurringPaymentDefinition,
        balance: Option<&SavingBalance>,
        year: i32,
        month: u32,
    ) -> RecurringResult<SavingBalance> {
        validate_year_month(year, month)?;
        let allocation = monthly_allocation(definition);

        let Some(existing) = balance else {
            let mut created = SavingBalance::new(
                Uuid::new_v4().to_string(),
                definition.id.clone(),
                year,
                month,
            );
            created.total_saved_amount = allocation;
            return Ok(created);
        };

        if existing.definition_id != definition.id {
            return Err(RecurringError::validation(format!(
                "Balance '{}' belongs to definition '{}', not '{}'",
                existing.id, existing.definition_id, definition.id
            )));
        }

        if month_index(year, month)
            <= month_index(existing.last_updated_year, existing.last_updated_month)
        {
            debug!(
                balance_id = %existing.id,
                year, month, "monthly saving already recorded"
            );
            return Ok(existing.clone());
        }

        let mut updated = existing.clone();
        updated.total_saved_amount += allocation;
        updated.last_updated_year = year;
        updated.last_updated_month = month;
        updated.touch();
        self.cache.invalidate_balance(&updated.id);
        Ok(updated)
    }

    /// Apply an occurrence's actual payment to the balance
    pub fn process_payment(
        &self,
        occurrence: &Occurrence,
        balance: &mut SavingBalance,
    ) -> RecurringResult<PaymentDifference> {
        let actual = occurrence.actual_amount.clone().ok_or_else(|| {
            RecurringError::validation(format!(
                "Occurrence '{}' has no actual amount",
                occurrence.id
            ))
        })?;
        if balance.definition_id != occurrence.definition_id {
            return Err(RecurringError::validation(format!(
                "Balance '{}' belongs to definition '{}', not '{}'",
                balance.id, balance.definition_id, occurrence.definition_id
            )));
        }

        balance.total_paid_amount += &actual;
        balance.touch();
        self.cache.invalidate_balance(&balance.id);

        Ok(PaymentDifference::between(
            occurrence.expected_amount.clone(),
            actual,
        ))
    }

    /// Recompute a balance from scratch
    ///
    /// Paid is the sum of actual amounts of completed occurrences; saved is
    /// the monthly allocation times the elapsed months. The result keeps the
    /// input balance's version and is cached until either version changes.
    pub fn recalculate_balance(
        &self,
        definition: &RecurringPaymentDefinition,
        balance: &SavingBalance,
        occurrences: &[Occurrence],
        period: BalancePeriod,
    ) -> RecurringResult<SavingBalance> {
        period.validate()?;

        let key = BalanceCacheKey {
            definition_id: definition.id.clone(),
            balance_id: balance.id.clone(),
            year: period.year,
            month: period.month,
            start_year: period.start_year,
            start_month: period.start_month,
            definition_version: definition.version,
            balance_version: balance.version,
        };

        let snapshot = self.cache.get_or_compute(key, || {
            let total_paid_amount: BigDecimal = occurrences
                .iter()
                .filter(|o| o.definition_id == definition.id && o.is_locked())
                .filter_map(|o| o.actual_amount.as_ref())
                .sum();
            let elapsed_months = period.elapsed_months();
            let total_saved_amount =
                monthly_allocation(definition) * BigDecimal::from(elapsed_months);

            Ok(BalanceSnapshot {
                balance: SavingBalance {
                    id: balance.id.clone(),
                    definition_id: definition.id.clone(),
                    total_saved_amount,
                    total_paid_amount,
                    last_updated_year: period.year,
                    last_updated_month: period.month,
                    version: balance.version,
                },
                elapsed_months,
            })
        })?;

        Ok(snapshot.balance)
    }

    /// Drop cached recalculations of a definition after it changed
    pub fn invalidate_definition(&self, definition_id: &str) -> usize {
        self.cache.invalidate_definition(definition_id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
