//! Reconciliation of generated schedule targets against persisted occurrences
//!
//! The planner never mutates its inputs. It returns a [`SynchronizationPlan`]
//! describing which occurrences to create, update and remove; completed
//! (locked) occurrences are passed through untouched.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::calendar::{months_between, shift_date_by_months, BusinessDayCalendar};
use crate::schedule::{default_status, RecurringScheduleGenerator, DEFAULT_MAX_SCHEDULE_ITERATIONS};
use crate::types::*;

/// Extra interval steps tried when looking for the period after the latest lock
const CONTINUATION_PROBES: i64 = 4;

/// Diffs a definition's schedule against its stored occurrences
#[derive(Debug, Clone)]
pub struct ReconciliationPlanner<'a> {
    calendar: &'a BusinessDayCalendar,
    max_iterations: usize,
}

impl<'a> ReconciliationPlanner<'a> {
    pub fn new(calendar: &'a BusinessDayCalendar) -> Self {
        Self {
            calendar,
            max_iterations: DEFAULT_MAX_SCHEDULE_ITERATIONS,
        }
    }

    /// Override the schedule iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    fn generator(&self) -> RecurringScheduleGenerator<'a> {
        RecurringScheduleGenerator::new(self.calendar).with_max_iterations(self.max_iterations)
    }

    /// Plan the occurrence changes for one definition
    ///
    /// With `backfill_from_first_date` the schedule is regenerated from the
    /// definition's first occurrence date; otherwise it continues with the
    /// first period after the latest completed occurrence.
    ///
    /// In continuation mode, pending occurrences dated before the latest
    /// completed one are no longer generated and end up in `removed`.
    /// Completing a later period first therefore retires the earlier
    /// unpaid ones; use backfill to keep them.
    pub fn synchronization_plan(
        &self,
        definition: &RecurringPaymentDefinition,
        existing: &[Occurrence],
        reference_date: NaiveDate,
        horizon_months: i32,
        backfill_from_first_date: bool,
    ) -> RecurringResult<SynchronizationPlan> {
        check_preconditions(definition, existing)?;

        let (locked, mutable): (Vec<&Occurrence>, Vec<&Occurrence>) =
            existing.iter().partition(|occurrence| occurrence.is_locked());
        let latest_locked = locked.iter().map(|o| o.scheduled_date).max();

        let seed = match latest_locked {
            Some(lock) if !backfill_from_first_date => self.continuation_seed(definition, lock)?,
            _ => Some(definition.first_occurrence_date),
        };
        let targets = match seed {
            Some(seed) => self.generator().schedule_targets(
                definition,
                seed,
                reference_date,
                horizon_months,
            )?,
            None => {
                if horizon_months < 0 {
                    return Err(RecurringError::InvalidHorizon(horizon_months));
                }
                Vec::new()
            }
        };

        let locked_dates: HashSet<NaiveDate> = locked.iter().map(|o| o.scheduled_date).collect();
        let mutable_by_date: HashMap<NaiveDate, &Occurrence> =
            mutable.iter().map(|o| (o.scheduled_date, *o)).collect();

        let mut plan = SynchronizationPlan {
            locked: locked.iter().map(|o| (*o).clone()).collect(),
            ..Default::default()
        };
        let mut retained: Vec<Occurrence> = Vec::new();
        let mut matched: HashSet<NaiveDate> = HashSet::new();

        for target in targets {
            if locked_dates.contains(&target.scheduled_date) {
                continue;
            }
            let status = default_status(
                target.scheduled_date,
                reference_date,
                definition.lead_time_months,
            );
            match mutable_by_date.get(&target.scheduled_date) {
                Some(current) => {
                    matched.insert(target.scheduled_date);
                    let mut refreshed = (*current).clone();
                    refreshed.expected_amount = target.expected_amount;
                    if !refreshed.status.is_manual() {
                        refreshed.status = status;
                    }
                    if refreshed != **current {
                        plan.updated.push(refreshed);
                    } else {
                        retained.push(refreshed);
                    }
                }
                None => plan.created.push(Occurrence::new(
                    Uuid::new_v4().to_string(),
                    definition.id.clone(),
                    target.scheduled_date,
                    target.expected_amount,
                    status,
                )),
            }
        }

        plan.removed = mutable
            .iter()
            .filter(|o| !matched.contains(&o.scheduled_date))
            .map(|o| (*o).clone())
            .collect();

        let mut occurrences: Vec<Occurrence> = plan
            .locked
            .iter()
            .chain(plan.created.iter())
            .chain(plan.updated.iter())
            .cloned()
            .chain(retained)
            .collect();
        occurrences.sort_by_key(|o| o.scheduled_date);
        if let Some(pair) = occurrences
            .windows(2)
            .find(|pair| pair[0].scheduled_date == pair[1].scheduled_date)
        {
            return Err(RecurringError::DuplicateOccurrenceDate {
                definition_id: definition.id.clone(),
                date: pair[0].scheduled_date,
            });
        }
        plan.occurrences = occurrences;

        debug!(
            definition_id = %definition.id,
            locked = plan.locked.len(),
            created = plan.created.len(),
            updated = plan.updated.len(),
            removed = plan.removed.len(),
            "synchronization plan computed"
        );

        Ok(plan)
    }

    // Seed month of the first period whose date falls after `lock`,
    // `None` when the definition has ended before then.
    fn continuation_seed(
        &self,
        definition: &RecurringPaymentDefinition,
        lock: NaiveDate,
    ) -> RecurringResult<Option<NaiveDate>> {
        let first = definition.first_occurrence_date;
        let interval = definition.recurrence_interval_months as i64;
        if interval <= 0 {
            return Err(RecurringError::InvalidRecurrence(
                definition.recurrence_interval_months,
            ));
        }

        // Start one period early: business-day adjustment may push the
        // locked period's date into the following month.
        let start = (months_between(first, lock) / interval - 1).max(0);
        let generator = self.generator();
        for k in start..start + CONTINUATION_PROBES {
            let Some(candidate) = shift_date_by_months(first, k * interval) else {
                return Ok(None);
            };
            let first_target = generator
                .schedule_targets(definition, candidate, candidate, 0)?
                .into_iter()
                .next();
            match first_target {
                None => return Ok(None),
                Some(target) if target.scheduled_date > lock => return Ok(Some(candidate)),
                Some(_) => {}
            }
        }
        Ok(shift_date_by_months(first, (start + CONTINUATION_PROBES) * interval))
    }
}

fn check_preconditions(
    definition: &RecurringPaymentDefinition,
    existing: &[Occurrence],
) -> RecurringResult<()> {
    let foreign: Vec<String> = existing
        .iter()
        .filter(|o| o.definition_id != definition.id)
        .map(|o| {
            format!(
                "Occurrence '{}' belongs to definition '{}', not '{}'",
                o.id, o.definition_id, definition.id
            )
        })
        .collect();
    if !foreign.is_empty() {
        return Err(RecurringError::ValidationFailed(foreign));
    }

    let mut seen = HashSet::new();
    for occurrence in existing {
        if !seen.insert(occurrence.scheduled_date) {
            return Err(RecurringError::DuplicateOccurrenceDate {
                definition_id: definition.id.clone(),
                date: occurrence.scheduled_date,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn definition(interval: i32, first: NaiveDate) -> RecurringPaymentDefinition {
        RecurringPaymentDefinition::new(
            "insurance".to_string(),
            "Insurance".to_string(),
            BigDecimal::from(30000),
            interval,
            first,
        )
    }

    fn occurrence(id: &str, date: NaiveDate, status: OccurrenceStatus) -> Occurrence {
        Occurrence::new(
            id.to_string(),
            "insurance".to_string(),
            date,
            BigDecimal::from(30000),
            status,
        )
    }

    fn completed(id: &str, date: NaiveDate) -> Occurrence {
        let mut occ = occurrence(id, date, OccurrenceStatus::Completed);
        occ.actual_date = Some(date);
        occ.actual_amount = Some(BigDecimal::from(31000));
        occ
    }

    fn dates(occurrences: &[Occurrence]) -> Vec<NaiveDate> {
        occurrences.iter().map(|o| o.scheduled_date).collect()
    }

    #[test]
    fn test_fresh_definition_creates_everything() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let def = definition(6, d(2025, 1, 10));
        let plan = planner
            .synchronization_plan(&def, &[], d(2025, 1, 1), 12, false)
            .unwrap();
        assert_eq!(
            dates(&plan.created),
            vec![d(2025, 1, 10), d(2025, 7, 10)]
        );
        assert!(plan.updated.is_empty() && plan.removed.is_empty());
        assert_eq!(plan.occurrences.len(), 2);
    }

    #[test]
    fn test_backfill_keeps_lock_and_fills_gap() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let def = definition(6, d(2024, 4, 1));
        let locked = completed("paid", d(2024, 10, 1));
        let plan = planner
            .synchronization_plan(&def, &[locked.clone()], d(2024, 10, 15), 3, true)
            .unwrap();
        assert_eq!(dates(&plan.created), vec![d(2024, 4, 1)]);
        assert_eq!(plan.locked, vec![locked]);
        assert!(plan.removed.is_empty());
        assert_eq!(dates(&plan.occurrences), vec![d(2024, 4, 1), d(2024, 10, 1)]);
    }

    #[test]
    fn test_continuation_starts_after_latest_lock() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let def = definition(12, d(2024, 5, 1));
        let locked = completed("paid", d(2025, 5, 1));
        let plan = planner
            .synchronization_plan(&def, &[locked], d(2025, 6, 1), 0, false)
            .unwrap();
        assert_eq!(dates(&plan.created), vec![d(2026, 5, 1)]);
    }

    #[test]
    fn test_lead_time_promotes_planned_to_saving() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let mut def = definition(12, d(2026, 5, 1));
        def.lead_time_months = 6;
        let existing = vec![occurrence("o1", d(2026, 5, 1), OccurrenceStatus::Planned)];
        let plan = planner
            .synchronization_plan(&def, &existing, d(2025, 12, 1), 0, false)
            .unwrap();
        assert_eq!(plan.updated.len(), 1);
        assert_eq!(plan.updated[0].id, "o1");
        assert_eq!(plan.updated[0].status, OccurrenceStatus::Saving);
        assert!(plan.created.is_empty());
    }

    #[test]
    fn test_amount_change_updates_but_manual_status_is_kept() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let mut def = definition(12, d(2026, 5, 1));
        def.amount = BigDecimal::from(32000);
        let existing = vec![occurrence("o1", d(2026, 5, 1), OccurrenceStatus::Skipped)];
        let plan = planner
            .synchronization_plan(&def, &existing, d(2026, 1, 1), 0, false)
            .unwrap();
        assert_eq!(plan.updated.len(), 1);
        assert_eq!(plan.updated[0].status, OccurrenceStatus::Skipped);
        assert_eq!(plan.updated[0].expected_amount, BigDecimal::from(32000));
    }

    #[test]
    fn test_moving_first_date_forward_retires_earlier_periods() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let def = definition(6, d(2025, 7, 1));
        let existing = vec![
            occurrence("old", d(2025, 1, 1), OccurrenceStatus::Saving),
            occurrence("keep", d(2025, 7, 1), OccurrenceStatus::Saving),
        ];
        let plan = planner
            .synchronization_plan(&def, &existing, d(2025, 1, 1), 6, false)
            .unwrap();
        assert_eq!(dates(&plan.removed), vec![d(2025, 1, 1)]);
        assert_eq!(dates(&plan.occurrences), vec![d(2025, 7, 1)]);
    }

    #[test]
    fn test_second_run_is_a_noop() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let mut def = definition(3, d(2025, 1, 31));
        def.lead_time_months = 2;
        def.day_of_month_pattern = Some(DayOfMonthPattern::EndOfMonth);
        let first = planner
            .synchronization_plan(&def, &[], d(2025, 1, 1), 12, true)
            .unwrap();
        let second = planner
            .synchronization_plan(&def, &first.occurrences, d(2025, 1, 1), 12, true)
            .unwrap();
        assert!(second.is_noop());
        assert_eq!(second.occurrences, first.occurrences);
    }

    #[test]
    fn test_duplicate_dates_are_a_precondition_failure() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let def = definition(1, d(2025, 1, 1));
        let existing = vec![
            occurrence("a", d(2025, 2, 1), OccurrenceStatus::Planned),
            completed("b", d(2025, 2, 1)),
        ];
        assert_eq!(
            planner.synchronization_plan(&def, &existing, d(2025, 1, 1), 3, true),
            Err(RecurringError::DuplicateOccurrenceDate {
                definition_id: "insurance".to_string(),
                date: d(2025, 2, 1),
            })
        );
    }

    #[test]
    fn test_foreign_occurrences_are_rejected() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let def = definition(1, d(2025, 1, 1));
        let mut stray = occurrence("x", d(2025, 2, 1), OccurrenceStatus::Planned);
        stray.definition_id = "rent".to_string();
        assert!(matches!(
            planner.synchronization_plan(&def, &[stray], d(2025, 1, 1), 3, true),
            Err(RecurringError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_completing_out_of_order_retires_earlier_pending_periods() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let def = definition(1, d(2025, 1, 1));
        let existing = vec![
            occurrence("jan", d(2025, 1, 1), OccurrenceStatus::Planned),
            occurrence("feb", d(2025, 2, 1), OccurrenceStatus::Planned),
            completed("mar", d(2025, 3, 1)),
        ];

        let plan = planner
            .synchronization_plan(&def, &existing, d(2025, 1, 1), 3, false)
            .unwrap();
        assert_eq!(dates(&plan.removed), vec![d(2025, 1, 1), d(2025, 2, 1)]);
        assert_eq!(dates(&plan.created), vec![d(2025, 4, 1)]);

        let kept = planner
            .synchronization_plan(&def, &existing, d(2025, 1, 1), 3, true)
            .unwrap();
        assert!(kept.removed.is_empty());
        assert_eq!(
            dates(&kept.occurrences),
            vec![d(2025, 1, 1), d(2025, 2, 1), d(2025, 3, 1), d(2025, 4, 1)]
        );
    }

    #[test]
    fn test_continuation_past_last_supported_year_generates_nothing() {
        let calendar = BusinessDayCalendar::new();
        let planner = ReconciliationPlanner::new(&calendar);
        let def = definition(200_000, d(2025, 1, 1));
        let locked = completed("paid", d(2025, 1, 1));
        let plan = planner
            .synchronization_plan(&def, &[locked.clone()], d(2025, 2, 1), 12, false)
            .unwrap();
        assert!(plan.created.is_empty());
        assert_eq!(plan.occurrences, vec![locked]);
    }
}
