//! Main orchestrator that ties storage to the pure scheduling engine

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::{
    add_months, BusinessDayCalendar, CustomHolidayProvider, JapaneseNationalHolidayProvider,
};
use crate::config::SchedulerConfig;
use crate::ledger::{CompletionParams, DefinitionManager, OccurrenceManager};
use crate::reconciliation::ReconciliationPlanner;
use crate::savings::{BalancePeriod, CacheStats, SavingBalanceCalculator};
use crate::traits::*;
use crate::types::*;

/// Recurring payment ledger: loads snapshots, runs the engine, stores results
pub struct RecurringPaymentLedger<S: RecurringPaymentStorage> {
    definition_manager: DefinitionManager<S>,
    occurrence_manager: OccurrenceManager<S>,
    storage: S,
    config: SchedulerConfig,
    calculator: SavingBalanceCalculator,
}

impl<S: RecurringPaymentStorage + CustomHolidaySource + Clone> RecurringPaymentLedger<S> {
    /// Create a new ledger with the default configuration
    pub fn new(storage: S) -> Self {
        Self::build(storage, SchedulerConfig::default(), Box::new(DefaultDefinitionValidator))
    }

    /// Create a new ledger with a custom configuration
    pub fn with_config(storage: S, config: SchedulerConfig) -> RecurringResult<Self> {
        config.validate()?;
        Ok(Self::build(
            storage,
            config,
            Box::new(DefaultDefinitionValidator),
        ))
    }

    /// Create a new ledger with a custom configuration and definition validator
    pub fn with_validator(
        storage: S,
        config: SchedulerConfig,
        validator: Box<dyn DefinitionValidator>,
    ) -> RecurringResult<Self> {
        config.validate()?;
        Ok(Self::build(storage, config, validator))
    }

    fn build(
        storage: S,
        config: SchedulerConfig,
        validator: Box<dyn DefinitionValidator>,
    ) -> Self {
        Self {
            definition_manager: DefinitionManager::with_validator(storage.clone(), validator),
            occurrence_manager: OccurrenceManager::new(storage.clone()),
            storage,
            config,
            calculator: SavingBalanceCalculator::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Business-day calendar built from the configured holiday sources
    ///
    /// Custom holidays are re-read from storage on every call.
    pub fn calendar(&self) -> BusinessDayCalendar {
        let mut calendar =
            BusinessDayCalendar::new().with_search_limit(self.config.business_day_search_limit);
        if self.config.include_national_holidays {
            calendar = calendar.with_provider(Arc::new(JapaneseNationalHolidayProvider::new()));
        }
        let custom = CustomHolidayProvider::from_source(&self.storage);
        if !custom.records().is_empty() {
            calendar = calendar.with_provider(Arc::new(custom));
        }
        calendar
    }

    // Definition operations
    /// Create a new definition
    pub async fn create_definition(
        &mut self,
        definition: RecurringPaymentDefinition,
    ) -> RecurringResult<RecurringPaymentDefinition> {
        let definition = self.definition_manager.create_definition(definition).await?;
        info!(definition_id = %definition.id, "recurring payment definition created");
        Ok(definition)
    }

    /// Get a definition by ID
    pub async fn get_definition(
        &self,
        definition_id: &str,
    ) -> RecurringResult<Option<RecurringPaymentDefinition>> {
        self.definition_manager.get_definition(definition_id).await
    }

    /// List definitions, optionally restricted to one category
    pub async fn list_definitions(
        &self,
        category_id: Option<&str>,
    ) -> RecurringResult<Vec<RecurringPaymentDefinition>> {
        self.definition_manager.list_definitions(category_id).await
    }

    /// Update a definition and drop its cached balances
    pub async fn update_definition(
        &mut self,
        definition: RecurringPaymentDefinition,
    ) -> RecurringResult<RecurringPaymentDefinition> {
        let definition = self.definition_manager.update_definition(definition).await?;
        let dropped = self.calculator.invalidate_definition(&definition.id);
        info!(
            definition_id = %definition.id,
            version = definition.version,
            dropped_cache_entries = dropped,
            "recurring payment definition updated"
        );
        Ok(definition)
    }

    /// Delete a definition together with its occurrences and balance
    pub async fn delete_definition(&mut self, definition_id: &str) -> RecurringResult<()> {
        self.definition_manager
            .get_definition_required(definition_id)
            .await?;

        let removed = self
            .occurrence_manager
            .delete_for_definition(definition_id)
            .await?;
        self.storage.delete_balance(definition_id).await?;
        self.definition_manager
            .delete_definition(definition_id)
            .await?;
        self.calculator.invalidate_definition(definition_id);

        info!(
            definition_id,
            removed_occurrences = removed,
            "recurring payment definition deleted"
        );
        Ok(())
    }

    // Occurrence operations
    /// Get an occurrence by ID
    pub async fn get_occurrence(&self, occurrence_id: &str) -> RecurringResult<Option<Occurrence>> {
        self.occurrence_manager.get_occurrence(occurrence_id).await
    }

    /// Occurrences of a definition, ordered by scheduled date
    pub async fn list_occurrences(&self, definition_id: &str) -> RecurringResult<Vec<Occurrence>> {
        self.occurrence_manager.list_occurrences(definition_id).await
    }

    /// Bring a definition's stored occurrences in line with its schedule
    pub async fn synchronize(
        &mut self,
        definition_id: &str,
        reference_date: NaiveDate,
    ) -> RecurringResult<SynchronizationPlan> {
        let definition = self
            .definition_manager
            .get_definition_required(definition_id)
            .await?;
        let existing = self
            .occurrence_manager
            .list_occurrences(definition_id)
            .await?;

        let calendar = self.calendar();
        let plan = ReconciliationPlanner::new(&calendar)
            .with_max_iterations(self.config.max_schedule_iterations)
            .synchronization_plan(
                &definition,
                &existing,
                reference_date,
                self.config.horizon_months,
                self.config.backfill_from_first_date,
            )?;

        if plan.is_noop() {
            debug!(definition_id, "schedule already in sync");
            return Ok(plan);
        }

        self.occurrence_manager.apply_plan(&plan).await?;
        info!(
            definition_id,
            %reference_date,
            created = plan.created.len(),
            updated = plan.updated.len(),
            removed = plan.removed.len(),
            "schedule synchronized"
        );
        Ok(plan)
    }

    /// Record the actual payment of an occurrence and apply it to the balance
    ///
    /// A balance created here starts in the month before the payment, so the
    /// payment month's saving can still be recorded afterwards.
    pub async fn complete_occurrence(
        &mut self,
        occurrence_id: &str,
        actual_date: NaiveDate,
        actual_amount: BigDecimal,
        transaction_id: Option<String>,
    ) -> RecurringResult<PaymentDifference> {
        let occurrence = self
            .occurrence_manager
            .get_occurrence_required(occurrence_id)
            .await?;
        let definition_id = occurrence.definition_id;
        self.definition_manager
            .get_definition_required(&definition_id)
            .await?;

        let completed = self
            .occurrence_manager
            .complete(CompletionParams {
                occurrence_id: occurrence_id.to_string(),
                actual_date,
                actual_amount,
                transaction_id,
            })
            .await?;

        let mut balance = match self.storage.get_balance(&definition_id).await? {
            Some(balance) => balance,
            None => {
                let (year, month) = add_months(actual_date.year(), actual_date.month(), -1);
                SavingBalance::new(Uuid::new_v4().to_string(), definition_id.clone(), year, month)
            }
        };
        let difference = self.calculator.process_payment(&completed, &mut balance)?;
        self.storage.save_balance(&balance).await?;

        info!(
            occurrence_id,
            definition_id = %definition_id,
            difference = %difference.difference,
            "occurrence completed"
        );
        Ok(difference)
    }

    /// Manually change the status of an unlocked occurrence
    pub async fn set_occurrence_status(
        &mut self,
        occurrence_id: &str,
        status: OccurrenceStatus,
    ) -> RecurringResult<Occurrence> {
        let occurrence = self
            .occurrence_manager
            .set_status(occurrence_id, status)
            .await?;
        info!(occurrence_id, ?status, "occurrence status changed");
        Ok(occurrence)
    }

    // Saving balance operations
    /// Get the saving balance of a definition
    pub async fn get_balance(&self, definition_id: &str) -> RecurringResult<Option<SavingBalance>> {
        self.storage.get_balance(definition_id).await
    }

    /// Add one month of savings to a definition's balance
    pub async fn record_monthly_savings(
        &mut self,
        definition_id: &str,
        year: i32,
        month: u32,
    ) -> RecurringResult<SavingBalance> {
        let definition = self
            .definition_manager
            .get_definition_required(definition_id)
            .await?;
        let existing = self.storage.get_balance(definition_id).await?;

        let balance =
            self.calculator
                .record_monthly_savings(&definition, existing.as_ref(), year, month)?;
        if existing.as_ref() != Some(&balance) {
            self.storage.save_balance(&balance).await?;
        }
        Ok(balance)
    }

    /// Recompute a definition's balance from its completed occurrences
    pub async fn recalculate_balance(
        &mut self,
        definition_id: &str,
        year: i32,
        month: u32,
        start_year: i32,
        start_month: u32,
    ) -> RecurringResult<SavingBalance> {
        let definition = self
            .definition_manager
            .get_definition_required(definition_id)
            .await?;
        let balance = match self.storage.get_balance(definition_id).await? {
            Some(balance) => balance,
            None => SavingBalance::new(
                Uuid::new_v4().to_string(),
                definition_id.to_string(),
                start_year,
                start_month,
            ),
        };
        let occurrences = self
            .occurrence_manager
            .list_occurrences(definition_id)
            .await?;

        let recalculated = self.calculator.recalculate_balance(
            &definition,
            &balance,
            &occurrences,
            BalancePeriod::new(year, month, start_year, start_month),
        )?;
        self.storage.save_balance(&recalculated).await?;
        Ok(recalculated)
    }

    /// Hit and miss counters of the balance recalculation cache
    pub fn balance_cache_stats(&self) -> CacheStats {
        self.calculator.cache_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DefinitionBuilder;
    use crate::utils::memory_storage::MemoryStorage;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_ledger_basic_operations() {
        let mut ledger = RecurringPaymentLedger::new(MemoryStorage::new());
        let definition = DefinitionBuilder::new(
            "rent".to_string(),
            "Rent".to_string(),
            BigDecimal::from(80000),
            1,
            d(2025, 1, 25),
        )
        .build()
        .unwrap();
        ledger.create_definition(definition).await.unwrap();

        let plan = ledger.synchronize("rent", d(2025, 1, 1)).await.unwrap();
        assert_eq!(plan.created.len(), 12);
        assert_eq!(ledger.list_occurrences("rent").await.unwrap().len(), 12);

        let first = &plan.occurrences[0];
        let difference = ledger
            .complete_occurrence(&first.id, d(2025, 1, 24), BigDecimal::from(81000), None)
            .await
            .unwrap();
        assert_eq!(difference.difference_type, PaymentDifferenceType::Overpaid);

        let balance = ledger.get_balance("rent").await.unwrap().unwrap();
        assert_eq!(balance.total_paid_amount, BigDecimal::from(81000));
        assert_eq!(
            (balance.last_updated_year, balance.last_updated_month),
            (2024, 12)
        );
    }

    #[tokio::test]
    async fn test_custom_holidays_reach_the_calendar() {
        let storage = MemoryStorage::new();
        storage
            .add_custom_holiday(CustomHoliday::new(d(2025, 6, 2), "Founders".to_string(), true))
            .unwrap();
        let ledger = RecurringPaymentLedger::new(storage);
        let calendar = ledger.calendar();
        assert!(calendar.is_holiday(d(2025, 6, 2)));
        assert!(calendar.is_holiday(d(2026, 6, 2)));
        assert!(calendar.is_holiday(d(2025, 1, 1)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SchedulerConfig::default().with_horizon_months(-3);
        assert!(matches!(
            RecurringPaymentLedger::with_config(MemoryStorage::new(), config),
            Err(RecurringError::InvalidHorizon(-3))
        ));
    }
}
