//! Turns a recurring payment definition into a dated sequence of targets

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::calendar::{checked_add_months, shift_date_by_months, BusinessDayCalendar, DayOfMonthResolver};
use crate::types::*;

/// Default bound on month steps taken by a single schedule generation
pub const DEFAULT_MAX_SCHEDULE_ITERATIONS: usize = 600;

/// Generates occurrence dates for a definition over a horizon
#[derive(Debug, Clone)]
pub struct RecurringScheduleGenerator<'a> {
    calendar: &'a BusinessDayCalendar,
    max_iterations: usize,
}

impl<'a> RecurringScheduleGenerator<'a> {
    pub fn new(calendar: &'a BusinessDayCalendar) -> Self {
        Self {
            calendar,
            max_iterations: DEFAULT_MAX_SCHEDULE_ITERATIONS,
        }
    }

    /// Override the iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Targets from the month of `seed_date` up to `reference_date + horizon_months`
    ///
    /// Steps forward by the definition's interval starting at the seed month,
    /// resolves each month through the day-of-month pattern (or the day of
    /// `first_occurrence_date`), then applies the date adjustment policy. The
    /// first step is always kept when it satisfies the end date, even if it
    /// lies beyond the horizon. Generation stops silently once the iteration
    /// cap is reached or the next step would leave the supported years; the
    /// targets generated so far are returned.
    pub fn schedule_targets(
        &self,
        definition: &RecurringPaymentDefinition,
        seed_date: NaiveDate,
        reference_date: NaiveDate,
        horizon_months: i32,
    ) -> RecurringResult<Vec<ScheduleTarget>> {
        if definition.recurrence_interval_months <= 0 {
            return Err(RecurringError::InvalidRecurrence(
                definition.recurrence_interval_months,
            ));
        }
        if horizon_months < 0 {
            return Err(RecurringError::InvalidHorizon(horizon_months));
        }

        let horizon_end = shift_date_by_months(reference_date, horizon_months as i64)
            .unwrap_or(NaiveDate::MAX);
        let resolver = DayOfMonthResolver::new(self.calendar);
        let default_day = definition.first_occurrence_date.day();
        let interval = definition.recurrence_interval_months as i64;

        let mut targets: Vec<ScheduleTarget> = Vec::new();
        let mut capped = true;
        for step in 0..self.max_iterations {
            let Some((year, month)) =
                checked_add_months(seed_date.year(), seed_date.month(), step as i64 * interval)
            else {
                debug!(definition_id = %definition.id, step, "schedule reached the last supported year");
                capped = false;
                break;
            };
            let resolved = resolver.resolve(
                year,
                month,
                definition.day_of_month_pattern.as_ref(),
                default_day,
            )?;
            let date = self
                .calendar
                .adjust(resolved, definition.date_adjustment_policy)?;

            let past_end = definition.end_date.is_some_and(|end| date > end);
            let past_horizon = step > 0 && date > horizon_end;
            if past_end || past_horizon {
                capped = false;
                break;
            }

            // Adjustment can pull a date back onto (or before) the previous one
            if targets.last().is_some_and(|last| date <= last.scheduled_date) {
                debug!(definition_id = %definition.id, %date, "dropping non-increasing target");
                continue;
            }

            targets.push(ScheduleTarget {
                scheduled_date: date,
                expected_amount: definition.amount.clone(),
            });
        }

        if capped {
            warn!(
                definition_id = %definition.id,
                max_iterations = self.max_iterations,
                generated = targets.len(),
                "schedule generation hit the iteration cap"
            );
        }

        Ok(targets)
    }
}

/// `Saving` when the date is within the lead-time window, `Planned` otherwise
pub fn default_status(
    scheduled_date: NaiveDate,
    reference_date: NaiveDate,
    lead_time_months: i32,
) -> OccurrenceStatus {
    let window_end =
        shift_date_by_months(reference_date, lead_time_months as i64).unwrap_or(NaiveDate::MAX);
    if scheduled_date <= window_end {
        OccurrenceStatus::Saving
    } else {
        OccurrenceStatus::Planned
    }
}
