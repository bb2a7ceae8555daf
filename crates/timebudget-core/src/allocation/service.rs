//! Gathers allocator inputs from storage and a calendar source.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{allocate, representative_efficiency, DateRange, TimeAllocation, DEFAULT_SLEEP_LABEL};
use crate::calendar::{CalendarEvent, CalendarSource};
use crate::error::{Result, ValidationError};
use crate::storage::ScheduleDb;

/// Allocation result plus the context it was computed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: i64,
    pub allocation: TimeAllocation,
    /// Efficiency divisor that was applied to task hours.
    pub efficiency: f64,
    pub calendar_source: String,
    /// False when the calendar could not be read and Schedule counts as 0.
    pub calendar_available: bool,
}

/// Runs the allocator over stored routines, tasks and efficiency records.
pub struct BudgetService<'a> {
    db: &'a ScheduleDb,
    calendar: &'a dyn CalendarSource,
    sleep_label: String,
}

impl<'a> BudgetService<'a> {
    pub fn new(db: &'a ScheduleDb, calendar: &'a dyn CalendarSource) -> Self {
        Self {
            db,
            calendar,
            sleep_label: DEFAULT_SLEEP_LABEL.to_string(),
        }
    }

    pub fn with_sleep_label(mut self, label: impl Into<String>) -> Self {
        self.sleep_label = label.into();
        self
    }

    /// Events for every day of the range, fetched one day at a time.
    ///
    /// A failing source is logged and treated as an empty calendar; the
    /// second value reports whether the fetch succeeded.
    pub fn calendar_events(&self, range: &DateRange) -> (Vec<CalendarEvent>, bool) {
        let mut events = Vec::new();
        for day in range.days() {
            match self.calendar.events_on(day) {
                Ok(mut day_events) => events.append(&mut day_events),
                Err(e) => {
                    log::warn!(
                        "calendar '{}' unavailable, counting schedule as 0h: {}",
                        self.calendar.name(),
                        e
                    );
                    return (Vec::new(), false);
                }
            }
        }
        (events, true)
    }

    /// Compute the five-bucket allocation for `range`.
    ///
    /// # Errors
    /// Returns an error if `range` is reversed, if storage cannot be read, or
    /// if a stored task has an unparsable due date.
    pub fn allocate(&self, range: DateRange) -> Result<AllocationReport> {
        if range.start > range.end {
            return Err(ValidationError::InvalidDateRange {
                start: range.start,
                end: range.end,
            }
            .into());
        }

        let routines = self.db.list_routines()?;
        let tasks = self.db.list_active_tasks()?;
        let efficiency_records = self.db.list_efficiency()?;
        let (events, calendar_available) = self.calendar_events(&range);

        log::debug!(
            "allocating {}..{}: {} events, {} routines, {} tasks, {} efficiency records",
            range.start,
            range.end,
            events.len(),
            routines.len(),
            tasks.len(),
            efficiency_records.len()
        );

        let allocation = allocate(
            &range,
            &events,
            &routines,
            &tasks,
            &efficiency_records,
            &self.sleep_label,
        );

        Ok(AllocationReport {
            start: range.start,
            end: range.end,
            days: range.day_count(),
            allocation,
            efficiency: representative_efficiency(&efficiency_records),
            calendar_source: self.calendar.name().to_string(),
            calendar_available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::schedule::{EfficiencyRecord, Routine, Task};
    use chrono::{NaiveDateTime, NaiveTime};

    struct Offline;

    impl CalendarSource for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn events_on(&self, _date: NaiveDate) -> Result<Vec<CalendarEvent>> {
            Err(CoreError::Calendar {
                source_name: "offline".into(),
                message: "no token".into(),
            })
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_allocate_from_storage() {
        let db = ScheduleDb::open_memory().unwrap();
        db.insert_routine(&Routine::new("Sleep", 8.0, 1)).unwrap();
        db.insert_routine(&Routine::new("Meals", 2.0, 1)).unwrap();
        db.insert_task(&Task::new("Overdue", date("2025-03-01"), NaiveTime::MIN, 3.0))
            .unwrap();
        db.insert_event(&CalendarEvent::new(
            "Lecture",
            at("2025-03-10T10:00:00"),
            at("2025-03-10T12:00:00"),
        ))
        .unwrap();

        let report = BudgetService::new(&db, &db)
            .allocate(DateRange::single(date("2025-03-10")))
            .unwrap();

        assert!(report.calendar_available);
        assert_eq!(report.days, 1);
        assert_eq!(report.allocation.schedule_hours, 2.0);
        assert_eq!(report.allocation.sleep_hours, 8.0);
        assert_eq!(report.allocation.routine_hours, 2.0);
        assert_eq!(report.allocation.task_hours, 3.0);
        assert_eq!(report.allocation.free_hours, 9.0);
    }

    #[test]
    fn test_custom_sleep_label() {
        let db = ScheduleDb::open_memory().unwrap();
        db.insert_routine(&Routine::new("睡眠", 7.0, 1)).unwrap();
        let report = BudgetService::new(&db, &db)
            .with_sleep_label("睡眠")
            .allocate(DateRange::single(date("2025-03-10")))
            .unwrap();
        assert_eq!(report.allocation.sleep_hours, 7.0);
        assert_eq!(report.allocation.routine_hours, 0.0);
    }

    #[test]
    fn test_offline_calendar_counts_as_zero() {
        let db = ScheduleDb::open_memory().unwrap();
        db.insert_efficiency(&EfficiencyRecord::new(date("2025-03-01"), date("2025-03-31"), 0.5))
            .unwrap();
        let report = BudgetService::new(&db, &Offline)
            .allocate(DateRange::new(date("2025-03-10"), date("2025-03-11")))
            .unwrap();
        assert!(!report.calendar_available);
        assert_eq!(report.calendar_source, "offline");
        assert_eq!(report.efficiency, 0.5);
        assert_eq!(report.allocation.free_hours, 48.0);
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let db = ScheduleDb::open_memory().unwrap();
        let err = BudgetService::new(&db, &db)
            .allocate(DateRange::new(date("2025-03-11"), date("2025-03-10")))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidDateRange { .. })
        ));
    }
}
