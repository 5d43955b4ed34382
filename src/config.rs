//! Scheduler configuration

use serde::{Deserialize, Serialize};

use crate::calendar::DEFAULT_BUSINESS_DAY_SEARCH_LIMIT;
use crate::schedule::DEFAULT_MAX_SCHEDULE_ITERATIONS;
use crate::types::*;

/// Settings used by the orchestration layer when synchronizing schedules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Months ahead of the reference date that must be covered by occurrences
    pub horizon_months: i32,
    /// Regenerate from the first occurrence date instead of the latest completed one
    pub backfill_from_first_date: bool,
    /// Compose Japanese national holidays into the business-day calendar
    pub include_national_holidays: bool,
    /// Days a business-day walk may cover before failing
    pub business_day_search_limit: u32,
    /// Month steps a single schedule generation may take
    pub max_schedule_iterations: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon_months: 12,
            backfill_from_first_date: false,
            include_national_holidays: true,
            business_day_search_limit: DEFAULT_BUSINESS_DAY_SEARCH_LIMIT,
            max_schedule_iterations: DEFAULT_MAX_SCHEDULE_ITERATIONS,
        }
    }
}

impl SchedulerConfig {
    /// Check the settings before use
    pub fn validate(&self) -> RecurringResult<()> {
        if self.horizon_months < 0 {
            return Err(RecurringError::InvalidHorizon(self.horizon_months));
        }
        let mut reasons = Vec::new();
        if self.business_day_search_limit == 0 {
            reasons.push("Business day search limit must be positive".to_string());
        }
        if self.max_schedule_iterations == 0 {
            reasons.push("Schedule iteration limit must be positive".to_string());
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(RecurringError::ValidationFailed(reasons))
        }
    }

    pub fn with_horizon_months(mut self, horizon_months: i32) -> Self {
        self.horizon_months = horizon_months;
        self
    }

    pub fn with_backfill(mut self, backfill_from_first_date: bool) -> Self {
        self.backfill_from_first_date = backfill_from_first_date;
        self
    }

    pub fn with_national_holidays(mut self, include: bool) -> Self {
        self.include_national_holidays = include;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.business_day_search_limit, 3650);
        assert_eq!(config.max_schedule_iterations, 600);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "horizon_months": 24, "backfill_from_first_date": true }"#)
                .unwrap();
        assert_eq!(config.horizon_months, 24);
        assert!(config.backfill_from_first_date);
        assert!(config.include_national_holidays);
    }

    #[test]
    fn test_invalid_settings() {
        let config = SchedulerConfig::default().with_horizon_months(-1);
        assert_eq!(config.validate(), Err(RecurringError::InvalidHorizon(-1)));

        let config = SchedulerConfig {
            business_day_search_limit: 0,
            max_schedule_iterations: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().reasons().len(), 2);
    }
}
