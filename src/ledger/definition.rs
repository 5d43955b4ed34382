//! Recurring payment definition management

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::traits::*;
use crate::types::*;

/// Definition manager for handling definition CRUD
pub struct DefinitionManager<S: RecurringPaymentStorage> {
    storage: S,
    validator: Box<dyn DefinitionValidator>,
}

impl<S: RecurringPaymentStorage> DefinitionManager<S> {
    /// Create a new definition manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultDefinitionValidator),
        }
    }

    /// Create a new definition manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn DefinitionValidator>) -> Self {
        Self { storage, validator }
    }

    /// Validate and persist a new definition
    pub async fn create_definition(
        &mut self,
        definition: RecurringPaymentDefinition,
    ) -> RecurringResult<RecurringPaymentDefinition> {
        self.validator.validate_definition(&definition)?;
        self.check_category(&definition).await?;

        if self.storage.get_definition(&definition.id).await?.is_some() {
            return Err(RecurringError::validation(format!(
                "Definition with ID '{}' already exists",
                definition.id
            )));
        }

        self.storage.save_definition(&definition).await?;
        Ok(definition)
    }

    /// Get a definition by ID
    pub async fn get_definition(
        &self,
        definition_id: &str,
    ) -> RecurringResult<Option<RecurringPaymentDefinition>> {
        self.storage.get_definition(definition_id).await
    }

    /// Get a definition by ID, returning an error if not found
    pub async fn get_definition_required(
        &self,
        definition_id: &str,
    ) -> RecurringResult<RecurringPaymentDefinition> {
        self.storage
            .get_definition(definition_id)
            .await?
            .ok_or_else(|| RecurringError::DefinitionNotFound(definition_id.to_string()))
    }

    /// List definitions, optionally restricted to one category
    pub async fn list_definitions(
        &self,
        category_id: Option<&str>,
    ) -> RecurringResult<Vec<RecurringPaymentDefinition>> {
        self.storage.list_definitions(category_id).await
    }

    /// Replace a stored definition, bumping its version past the stored one
    pub async fn update_definition(
        &mut self,
        mut definition: RecurringPaymentDefinition,
    ) -> RecurringResult<RecurringPaymentDefinition> {
        let existing = self.get_definition_required(&definition.id).await?;

        self.validator.validate_definition(&definition)?;
        self.check_category(&definition).await?;

        definition.version = existing.version;
        definition.touch();
        self.storage.update_definition(&definition).await?;
        Ok(definition)
    }

    /// Delete a definition record
    pub async fn delete_definition(&mut self, definition_id: &str) -> RecurringResult<()> {
        if self.storage.get_definition(definition_id).await?.is_none() {
            return Err(RecurringError::DefinitionNotFound(definition_id.to_string()));
        }
        self.storage.delete_definition(definition_id).await
    }

    async fn check_category(&self, definition: &RecurringPaymentDefinition) -> RecurringResult<()> {
        if let Some(ref category_id) = definition.category_id {
            if !self.storage.category_exists(category_id).await? {
                return Err(RecurringError::CategoryNotFound(category_id.clone()));
            }
        }
        Ok(())
    }
}

/// Builder for recurring payment definitions
pub struct DefinitionBuilder {
    definition: RecurringPaymentDefinition,
}

impl DefinitionBuilder {
    /// Create a new definition builder
    pub fn new(
        id: String,
        name: String,
        amount: BigDecimal,
        recurrence_interval_months: i32,
        first_occurrence_date: NaiveDate,
    ) -> Self {
        Self {
            definition: RecurringPaymentDefinition::new(
                id,
                name,
                amount,
                recurrence_interval_months,
                first_occurrence_date,
            ),
        }
    }

    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.definition.end_date = Some(end_date);
        self
    }

    pub fn lead_time_months(mut self, lead_time_months: i32) -> Self {
        self.definition.lead_time_months = lead_time_months;
        self
    }

    pub fn day_of_month(mut self, pattern: DayOfMonthPattern) -> Self {
        self.definition.day_of_month_pattern = Some(pattern);
        self
    }

    pub fn adjustment(mut self, policy: DateAdjustmentPolicy) -> Self {
        self.definition.date_adjustment_policy = policy;
        self
    }

    /// Save `amount / interval` every month
    pub fn evenly_distributed_savings(mut self) -> Self {
        self.definition.saving_strategy = SavingStrategy::EvenlyDistributed;
        self.definition.custom_monthly_saving_amount = None;
        self
    }

    /// Save a fixed amount every month
    pub fn custom_savings(mut self, monthly_amount: BigDecimal) -> Self {
        self.definition.saving_strategy = SavingStrategy::Custom;
        self.definition.custom_monthly_saving_amount = Some(monthly_amount);
        self
    }

    pub fn category(mut self, category_id: String) -> Self {
        self.definition.category_id = Some(category_id);
        self
    }

    /// Build and validate the definition
    pub fn build(self) -> RecurringResult<RecurringPaymentDefinition> {
        DefaultDefinitionValidator.validate_definition(&self.definition)?;
        Ok(self.definition)
    }
}
