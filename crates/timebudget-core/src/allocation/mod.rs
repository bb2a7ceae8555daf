//! Time-budget allocator.
//!
//! Splits the hours of a date range into five buckets:
//! - Schedule: confirmed calendar events
//! - Routine: recurring routines other than sleep
//! - Sleep: the routine titled with the sleep label
//! - Tasks: outstanding work, spread toward each deadline and scaled by efficiency
//! - Free Time: whatever is left, clamped at zero
//!
//! The allocator is a pure function over fetched inputs. Gathering those
//! inputs lives in [`service`].

pub mod service;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarEvent;
use crate::schedule::{EfficiencyRecord, Routine, Task};

pub use service::{AllocationReport, BudgetService};

pub const HOURS_PER_DAY: f64 = 24.0;
pub const DEFAULT_SLEEP_LABEL: &str = "Sleep";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self::new(day, day)
    }

    /// Number of days in the range. A reversed range has zero days.
    pub fn day_count(&self) -> i64 {
        ((self.end - self.start).num_days() + 1).max(0)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Each day in order, start first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.day_count() as usize)
    }

    pub fn total_hours(&self) -> f64 {
        HOURS_PER_DAY * self.day_count() as f64
    }
}

/// One of the five allocation buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategory {
    Schedule,
    Routine,
    Sleep,
    Tasks,
    FreeTime,
}

impl BudgetCategory {
    pub const ALL: [BudgetCategory; 5] = [
        BudgetCategory::Schedule,
        BudgetCategory::Routine,
        BudgetCategory::Sleep,
        BudgetCategory::Tasks,
        BudgetCategory::FreeTime,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BudgetCategory::Schedule => "Schedule",
            BudgetCategory::Routine => "Routine",
            BudgetCategory::Sleep => "Sleep",
            BudgetCategory::Tasks => "Tasks",
            BudgetCategory::FreeTime => "Free Time",
        }
    }
}

/// Hour totals per bucket. All values are non-negative.
///
/// `task_hours` is not capped by the day length, so the buckets can add up
/// to more than the range's hours when overdue work piles onto one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeAllocation {
    pub schedule_hours: f64,
    pub routine_hours: f64,
    pub sleep_hours: f64,
    pub task_hours: f64,
    pub free_hours: f64,
}

impl TimeAllocation {
    pub fn hours(&self, category: BudgetCategory) -> f64 {
        match category {
            BudgetCategory::Schedule => self.schedule_hours,
            BudgetCategory::Routine => self.routine_hours,
            BudgetCategory::Sleep => self.sleep_hours,
            BudgetCategory::Tasks => self.task_hours,
            BudgetCategory::FreeTime => self.free_hours,
        }
    }

    /// `(category, hours)` rows in display order.
    pub fn categories(&self) -> Vec<(BudgetCategory, f64)> {
        BudgetCategory::ALL
            .iter()
            .map(|c| (*c, self.hours(*c)))
            .collect()
    }

    pub fn total_hours(&self) -> f64 {
        BudgetCategory::ALL
            .iter()
            .fold(0.0, |acc, c| acc + self.hours(*c))
    }

    /// Share of each bucket in the total. Empty allocations yield all zeros.
    pub fn proportions(&self) -> Vec<(BudgetCategory, f64)> {
        let total = self.total_hours();
        self.categories()
            .into_iter()
            .map(|(c, h)| (c, if total > 0.0 { h / total } else { 0.0 }))
            .collect()
    }
}

/// Mean of the configured efficiencies, or 1.0 when there are none or the
/// mean is not a positive normal number.
pub fn representative_efficiency(records: &[EfficiencyRecord]) -> f64 {
    let values: Vec<f64> = records
        .iter()
        .map(|r| r.efficiency)
        .filter(|e| e.is_finite())
        .collect();
    if values.is_empty() {
        return 1.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean.is_normal() && mean > 0.0 {
        mean
    } else {
        1.0
    }
}

/// Hours of events starting inside the range.
pub fn schedule_hours(range: &DateRange, events: &[CalendarEvent]) -> f64 {
    events
        .iter()
        .filter(|e| range.contains(e.date()))
        .map(CalendarEvent::duration_hours)
        .fold(0.0, |acc, h| acc + h)
}

/// `(sleep, other)` routine hours over the range.
pub fn routine_hours(range: &DateRange, routines: &[Routine], sleep_label: &str) -> (f64, f64) {
    let days = range.day_count() as f64;
    let mut sleep = 0.0;
    let mut other = 0.0;
    for routine in routines {
        if routine.period_days <= 0 {
            log::warn!(
                "skipping routine '{}' with non-positive period {}",
                routine.title,
                routine.period_days
            );
            continue;
        }
        let hours = days * routine.daily_hours();
        if routine.title == sleep_label {
            sleep += hours;
        } else {
            other += hours;
        }
    }
    (sleep, other)
}

/// Raw task hours over the range, before the efficiency divisor.
///
/// Each day, every task still carrying effort gets `remaining / days_left`,
/// or all of it once the deadline has been reached.
pub fn raw_task_hours(range: &DateRange, tasks: &[Task]) -> f64 {
    let mut remaining: Vec<f64> = tasks.iter().map(Task::remaining_hours).collect();
    let dues: Vec<NaiveDateTime> = tasks.iter().map(Task::due).collect();
    let mut total = 0.0;

    for day in range.days() {
        let day_start = day.and_time(NaiveTime::MIN);
        let mut day_total = 0.0;
        for (rem, due) in remaining.iter_mut().zip(&dues) {
            if *rem <= 0.0 {
                continue;
            }
            let delta_days = fractional_days(*due - day_start);
            let alloc = if delta_days <= 0.0 {
                *rem
            } else {
                *rem / delta_days
            };
            let alloc = alloc.clamp(0.0, *rem);
            *rem -= alloc;
            day_total += alloc;
        }
        log::debug!("{day}: {day_total:.2}h of task work");
        total += day_total;
    }
    total
}

fn fractional_days(delta: Duration) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}

/// Partition the hours of `range` across the five buckets.
///
/// Never fails. A reversed range produces an all-zero allocation.
pub fn allocate(
    range: &DateRange,
    events: &[CalendarEvent],
    routines: &[Routine],
    tasks: &[Task],
    efficiency_records: &[EfficiencyRecord],
    sleep_label: &str,
) -> TimeAllocation {
    let schedule = schedule_hours(range, events);
    let (sleep, routine) = routine_hours(range, routines, sleep_label);
    let efficiency = representative_efficiency(efficiency_records);
    let tasks_total = raw_task_hours(range, tasks) / efficiency;
    let free = (range.total_hours() - (schedule + routine + sleep + tasks_total)).max(0.0);

    TimeAllocation {
        schedule_hours: schedule,
        routine_hours: routine,
        sleep_hours: sleep,
        task_hours: tasks_total,
        free_hours: free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_day_count() {
        assert_eq!(DateRange::single(date("2025-03-10")).day_count(), 1);
        assert_eq!(DateRange::new(date("2025-03-10"), date("2025-03-14")).day_count(), 5);
        assert_eq!(DateRange::new(date("2025-03-14"), date("2025-03-10")).day_count(), 0);
        assert_eq!(DateRange::new(date("2025-03-14"), date("2025-03-10")).days().count(), 0);
    }

    #[test]
    fn test_empty_inputs_are_all_free_time() {
        let range = DateRange::new(date("2025-03-10"), date("2025-03-12"));
        let a = allocate(&range, &[], &[], &[], &[], DEFAULT_SLEEP_LABEL);
        assert_eq!(a.free_hours, 72.0);
        assert_eq!(a.schedule_hours, 0.0);
        assert_eq!(a.routine_hours, 0.0);
        assert_eq!(a.sleep_hours, 0.0);
        assert_eq!(a.task_hours, 0.0);
    }

    #[test]
    fn test_sleep_routine_scenario() {
        let range = DateRange::single(date("2025-03-10"));
        let routines = vec![Routine::new("Sleep", 8.0, 1)];
        let a = allocate(&range, &[], &routines, &[], &[], "Sleep");
        assert_eq!(a.sleep_hours, 8.0);
        assert_eq!(a.free_hours, 16.0);
        assert_eq!(a.routine_hours, 0.0);
        assert_eq!(a.task_hours, 0.0);
        assert_eq!(a.schedule_hours, 0.0);
    }

    #[test]
    fn test_routine_split_uses_exact_label() {
        let range = DateRange::new(date("2025-03-10"), date("2025-03-13"));
        let routines = vec![
            Routine::new("Sleep", 7.0, 1),
            Routine::new("sleep", 1.0, 1),
            Routine::new("Laundry", 2.0, 4),
        ];
        let (sleep, other) = routine_hours(&range, &routines, "Sleep");
        assert_eq!(sleep, 28.0);
        assert_eq!(other, 4.0 + 2.0);
    }

    #[test]
    fn test_routine_with_zero_period_is_skipped() {
        let range = DateRange::single(date("2025-03-10"));
        let routines = vec![Routine::new("Broken", 3.0, 0), Routine::new("Meals", 2.0, 1)];
        let (_, other) = routine_hours(&range, &routines, "Sleep");
        assert_eq!(other, 2.0);
    }

    #[test]
    fn test_schedule_hours_only_counts_range() {
        let range = DateRange::single(date("2025-03-10"));
        let events = vec![
            CalendarEvent::new("In", at("2025-03-10T09:00:00"), at("2025-03-10T10:30:00")),
            CalendarEvent::new("Out", at("2025-03-11T09:00:00"), at("2025-03-11T10:00:00")),
        ];
        assert_eq!(schedule_hours(&range, &events), 1.5);
    }

    #[test]
    fn test_task_spread_evenly_to_deadline() {
        // due at the end of a 5-day range: 10h over 5 days, 2h each
        let start = date("2025-03-10");
        let task = Task::new("Essay", date("2025-03-15"), NaiveTime::MIN, 10.0);
        for k in 0..5 {
            let prefix = DateRange::new(start, start + Duration::days(k));
            let hours = raw_task_hours(&prefix, &[task.clone()]);
            assert!(approx(hours, 2.0 * (k + 1) as f64), "day {k}: {hours}");
        }
    }

    #[test]
    fn test_empty_buckets_are_positive_zero() {
        let range = DateRange::single(date("2025-03-10"));
        let a = allocate(&range, &[], &[], &[], &[], DEFAULT_SLEEP_LABEL);
        for (category, hours) in a.categories() {
            assert!(hours.is_sign_positive(), "{}: {hours}", category.label());
        }
        let json = serde_json::to_string(&a).unwrap();
        assert!(!json.contains("-0"), "{json}");
    }

    #[test]
    fn test_overdue_task_lands_on_first_day() {
        let range = DateRange::new(date("2025-03-10"), date("2025-03-12"));
        let task = Task::new("Tax return", date("2025-03-01"), NaiveTime::MIN, 6.0);
        let first_day = DateRange::single(date("2025-03-10"));
        assert_eq!(raw_task_hours(&first_day, &[task.clone()]), 6.0);
        assert_eq!(raw_task_hours(&range, &[task]), 6.0);
    }

    #[test]
    fn test_due_within_a_day_clamps_to_remaining() {
        let range = DateRange::single(date("2025-03-10"));
        let due_noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let task = Task::new("Call back", date("2025-03-10"), due_noon, 3.0);
        // delta is half a day, 3 / 0.5 = 6 clamps to 3
        assert_eq!(raw_task_hours(&range, &[task]), 3.0);
    }

    #[test]
    fn test_finished_task_contributes_nothing() {
        let range = DateRange::new(date("2025-03-10"), date("2025-03-12"));
        let done = Task::new("Done", date("2025-03-11"), NaiveTime::MIN, 40.0).with_progress(1.0);
        let done_pct = Task::new("Done%", date("2025-03-11"), NaiveTime::MIN, 40.0).with_progress(100.0);
        assert_eq!(raw_task_hours(&range, &[done, done_pct]), 0.0);
    }

    #[test]
    fn test_partial_progress_reduces_effort() {
        let range = DateRange::single(date("2025-03-10"));
        let task = Task::new("Slides", date("2025-03-09"), NaiveTime::MIN, 8.0).with_progress(75.0);
        assert_eq!(raw_task_hours(&range, &[task]), 2.0);
    }

    #[test]
    fn test_efficiency_divides_task_hours() {
        let range = DateRange::single(date("2025-03-10"));
        let task = Task::new("Code review", date("2025-03-01"), NaiveTime::MIN, 4.0);
        let effs = vec![EfficiencyRecord::new(date("2025-03-01"), date("2025-03-31"), 0.5)];
        let a = allocate(&range, &[], &[], &[task], &effs, "Sleep");
        assert_eq!(a.task_hours, 8.0);
        assert_eq!(a.free_hours, 16.0);
    }

    #[test]
    fn test_representative_efficiency_fallbacks() {
        let d = date("2025-03-01");
        assert_eq!(representative_efficiency(&[]), 1.0);
        let mixed = vec![EfficiencyRecord::new(d, d, 0.5), EfficiencyRecord::new(d, d, 1.5)];
        assert_eq!(representative_efficiency(&mixed), 1.0);
        let pair = vec![EfficiencyRecord::new(d, d, 0.6), EfficiencyRecord::new(d, d, 0.8)];
        assert!(approx(representative_efficiency(&pair), 0.7));
        let negative = vec![EfficiencyRecord::new(d, d, -2.0)];
        assert_eq!(representative_efficiency(&negative), 1.0);
        let subnormal = vec![EfficiencyRecord::new(d, d, 1e-320)];
        assert_eq!(representative_efficiency(&subnormal), 1.0);
    }

    #[test]
    fn test_overlapping_overdue_tasks_may_exceed_day() {
        let range = DateRange::single(date("2025-03-10"));
        let tasks = vec![
            Task::new("A", date("2025-03-01"), NaiveTime::MIN, 20.0),
            Task::new("B", date("2025-03-01"), NaiveTime::MIN, 20.0),
        ];
        let a = allocate(&range, &[], &[], &tasks, &[], "Sleep");
        assert_eq!(a.task_hours, 40.0);
        assert_eq!(a.free_hours, 0.0);
        assert!(a.total_hours() > range.total_hours());
    }

    #[test]
    fn test_reversed_range_is_all_zero() {
        let range = DateRange::new(date("2025-03-12"), date("2025-03-10"));
        let routines = vec![Routine::new("Sleep", 8.0, 1)];
        let tasks = vec![Task::new("A", date("2025-03-01"), NaiveTime::MIN, 5.0)];
        let a = allocate(&range, &[], &routines, &tasks, &[], "Sleep");
        assert_eq!(a, TimeAllocation::default());
    }

    #[test]
    fn test_categories_and_proportions() {
        let a = TimeAllocation {
            schedule_hours: 6.0,
            routine_hours: 2.0,
            sleep_hours: 8.0,
            task_hours: 4.0,
            free_hours: 4.0,
        };
        let labels: Vec<&str> = a.categories().iter().map(|(c, _)| c.label()).collect();
        assert_eq!(labels, vec!["Schedule", "Routine", "Sleep", "Tasks", "Free Time"]);
        assert_eq!(a.total_hours(), 24.0);
        let shares = a.proportions();
        assert_eq!(shares[2], (BudgetCategory::Sleep, 8.0 / 24.0));
        assert!(TimeAllocation::default()
            .proportions()
            .iter()
            .all(|(_, s)| *s == 0.0));
    }
}
