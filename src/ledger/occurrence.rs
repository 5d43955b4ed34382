//! Occurrence persistence and manual status changes

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_non_negative_amount;

/// Parameters for completing an occurrence with its actual payment
#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub occurrence_id: String,
    pub actual_date: NaiveDate,
    pub actual_amount: BigDecimal,
    pub transaction_id: Option<String>,
}

/// Occurrence manager for handling occurrence operations
pub struct OccurrenceManager<S: RecurringPaymentStorage> {
    storage: S,
}

impl<S: RecurringPaymentStorage> OccurrenceManager<S> {
    /// Create a new occurrence manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Get an occurrence by ID
    pub async fn get_occurrence(&self, occurrence_id: &str) -> RecurringResult<Option<Occurrence>> {
        self.storage.get_occurrence(occurrence_id).await
    }

    /// Get an occurrence by ID, returning an error if not found
    pub async fn get_occurrence_required(&self, occurrence_id: &str) -> RecurringResult<Occurrence> {
        self.storage
            .get_occurrence(occurrence_id)
            .await?
            .ok_or_else(|| RecurringError::OccurrenceNotFound(occurrence_id.to_string()))
    }

    /// Occurrences of a definition, ordered by scheduled date
    pub async fn list_occurrences(&self, definition_id: &str) -> RecurringResult<Vec<Occurrence>> {
        let mut occurrences = self.storage.list_occurrences(definition_id).await?;
        occurrences.sort_by_key(|occurrence| occurrence.scheduled_date);
        Ok(occurrences)
    }

    /// Persist a synchronization plan
    pub async fn apply_plan(&mut self, plan: &SynchronizationPlan) -> RecurringResult<()> {
        for occurrence in &plan.removed {
            self.storage.delete_occurrence(&occurrence.id).await?;
        }
        for occurrence in &plan.updated {
            self.storage.update_occurrence(occurrence).await?;
        }
        for occurrence in &plan.created {
            self.storage.save_occurrence(occurrence).await?;
        }
        Ok(())
    }

    /// Mark an occurrence as paid
    ///
    /// The occurrence becomes locked; synchronization never changes it again.
    pub async fn complete(&mut self, params: CompletionParams) -> RecurringResult<Occurrence> {
        validate_non_negative_amount(&params.actual_amount)?;

        let mut occurrence = self.get_occurrence_required(&params.occurrence_id).await?;
        if occurrence.is_locked() {
            return Err(RecurringError::validation(format!(
                "Occurrence '{}' is already completed",
                occurrence.id
            )));
        }

        occurrence.status = OccurrenceStatus::Completed;
        occurrence.actual_date = Some(params.actual_date);
        occurrence.actual_amount = Some(params.actual_amount);
        occurrence.transaction_id = params.transaction_id;

        self.storage.update_occurrence(&occurrence).await?;
        Ok(occurrence)
    }

    /// Change the status of an unlocked occurrence
    pub async fn set_status(
        &mut self,
        occurrence_id: &str,
        status: OccurrenceStatus,
    ) -> RecurringResult<Occurrence> {
        if status == OccurrenceStatus::Completed {
            return Err(RecurringError::validation(
                "Use complete_occurrence to mark an occurrence as completed",
            ));
        }

        let mut occurrence = self.get_occurrence_required(occurrence_id).await?;
        if occurrence.is_locked() {
            return Err(RecurringError::validation(format!(
                "Occurrence '{}' is completed and cannot change status",
                occurrence.id
            )));
        }

        occurrence.status = status;
        self.storage.update_occurrence(&occurrence).await?;
        Ok(occurrence)
    }

    /// Delete every occurrence of a definition, returning how many were removed
    pub async fn delete_for_definition(&mut self, definition_id: &str) -> RecurringResult<usize> {
        let occurrences = self.storage.list_occurrences(definition_id).await?;
        for occurrence in &occurrences {
            self.storage.delete_occurrence(&occurrence.id).await?;
        }
        Ok(occurrences.len())
    }
}
