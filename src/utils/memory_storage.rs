//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    definitions: Arc<RwLock<HashMap<String, RecurringPaymentDefinition>>>,
    occurrences: Arc<RwLock<HashMap<String, Occurrence>>>,
    balances: Arc<RwLock<HashMap<String, SavingBalance>>>,
    categories: Arc<RwLock<HashSet<String>>>,
    custom_holidays: Arc<RwLock<Vec<CustomHoliday>>>,
}

fn read<T>(lock: &RwLock<T>) -> RecurringResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| RecurringError::Storage("storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> RecurringResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| RecurringError::Storage("storage lock poisoned".to_string()))
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> RecurringResult<()> {
        write(&self.definitions)?.clear();
        write(&self.occurrences)?.clear();
        write(&self.balances)?.clear();
        write(&self.categories)?.clear();
        write(&self.custom_holidays)?.clear();
        Ok(())
    }

    /// Register a category ID
    pub fn add_category(&self, category_id: &str) -> RecurringResult<()> {
        write(&self.categories)?.insert(category_id.to_string());
        Ok(())
    }

    /// Store a user-defined holiday
    pub fn add_custom_holiday(&self, holiday: CustomHoliday) -> RecurringResult<()> {
        write(&self.custom_holidays)?.push(holiday);
        Ok(())
    }
}

impl CustomHolidaySource for MemoryStorage {
    fn custom_holidays(&self) -> Vec<CustomHoliday> {
        self.custom_holidays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RecurringPaymentStorage for MemoryStorage {
    async fn save_definition(
        &mut self,
        definition: &RecurringPaymentDefinition,
    ) -> RecurringResult<()> {
        write(&self.definitions)?.insert(definition.id.clone(), definition.clone());
        Ok(())
    }

    async fn get_definition(
        &self,
        definition_id: &str,
    ) -> RecurringResult<Option<RecurringPaymentDefinition>> {
        Ok(read(&self.definitions)?.get(definition_id).cloned())
    }

    async fn list_definitions(
        &self,
        category_id: Option<&str>,
    ) -> RecurringResult<Vec<RecurringPaymentDefinition>> {
        let definitions = read(&self.definitions)?;
        let mut filtered: Vec<RecurringPaymentDefinition> = definitions
            .values()
            .filter(|definition| {
                category_id.map_or(true, |c| definition.category_id.as_deref() == Some(c))
            })
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(filtered)
    }

    async fn update_definition(
        &mut self,
        definition: &RecurringPaymentDefinition,
    ) -> RecurringResult<()> {
        let mut definitions = write(&self.definitions)?;
        if definitions.contains_key(&definition.id) {
            definitions.insert(definition.id.clone(), definition.clone());
            Ok(())
        } else {
            Err(RecurringError::DefinitionNotFound(definition.id.clone()))
        }
    }

    async fn delete_definition(&mut self, definition_id: &str) -> RecurringResult<()> {
        if write(&self.definitions)?.remove(definition_id).is_some() {
            Ok(())
        } else {
            Err(RecurringError::DefinitionNotFound(definition_id.to_string()))
        }
    }

    async fn save_occurrence(&mut self, occurrence: &Occurrence) -> RecurringResult<()> {
        write(&self.occurrences)?.insert(occurrence.id.clone(), occurrence.clone());
        Ok(())
    }

    async fn get_occurrence(&self, occurrence_id: &str) -> RecurringResult<Option<Occurrence>> {
        Ok(read(&self.occurrences)?.get(occurrence_id).cloned())
    }

    async fn list_occurrences(&self, definition_id: &str) -> RecurringResult<Vec<Occurrence>> {
        let occurrences = read(&self.occurrences)?;
        let mut filtered: Vec<Occurrence> = occurrences
            .values()
            .filter(|occurrence| occurrence.definition_id == definition_id)
            .cloned()
            .collect();
        filtered.sort_by_key(|occurrence| occurrence.scheduled_date);
        Ok(filtered)
    }

    async fn update_occurrence(&mut self, occurrence: &Occurrence) -> RecurringResult<()> {
        let mut occurrences = write(&self.occurrences)?;
        if occurrences.contains_key(&occurrence.id) {
            occurrences.insert(occurrence.id.clone(), occurrence.clone());
            Ok(())
        } else {
            Err(RecurringError::OccurrenceNotFound(occurrence.id.clone()))
        }
    }

    async fn delete_occurrence(&mut self, occurrence_id: &str) -> RecurringResult<()> {
        if write(&self.occurrences)?.remove(occurrence_id).is_some() {
            Ok(())
        } else {
            Err(RecurringError::OccurrenceNotFound(occurrence_id.to_string()))
        }
    }

    async fn get_balance(&self, definition_id: &str) -> RecurringResult<Option<SavingBalance>> {
        Ok(read(&self.balances)?.get(definition_id).cloned())
    }

    async fn save_balance(&mut self, balance: &SavingBalance) -> RecurringResult<()> {
        write(&self.balances)?.insert(balance.definition_id.clone(), balance.clone());
        Ok(())
    }

    async fn delete_balance(&mut self, definition_id: &str) -> RecurringResult<()> {
        write(&self.balances)?.remove(definition_id);
        Ok(())
    }

    async fn category_exists(&self, category_id: &str) -> RecurringResult<bool> {
        Ok(read(&self.categories)?.contains(category_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_occurrences_are_listed_by_date() {
        let mut storage = MemoryStorage::new();
        for (id, date) in [("b", d(2025, 3, 1)), ("a", d(2025, 1, 1)), ("c", d(2025, 2, 1))] {
            storage
                .save_occurrence(&Occurrence::new(
                    id.to_string(),
                    "rent".to_string(),
                    date,
                    BigDecimal::from(80000),
                    OccurrenceStatus::Planned,
                ))
                .await
                .unwrap();
        }
        let listed = storage.list_occurrences("rent").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert!(storage.list_occurrences("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_definition_fails() {
        let mut storage = MemoryStorage::new();
        let definition = RecurringPaymentDefinition::new(
            "rent".to_string(),
            "Rent".to_string(),
            BigDecimal::from(80000),
            1,
            d(2025, 1, 25),
        );
        assert_eq!(
            storage.update_definition(&definition).await,
            Err(RecurringError::DefinitionNotFound("rent".to_string()))
        );
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();
        storage.add_category("housing").unwrap();
        storage
            .add_custom_holiday(CustomHoliday::new(d(2025, 8, 15), "Obon".to_string(), true))
            .unwrap();
        assert!(clone.category_exists("housing").await.unwrap());
        assert_eq!(clone.custom_holidays().len(), 1);
        storage.clear().unwrap();
        assert!(!clone.category_exists("housing").await.unwrap());
    }
}
