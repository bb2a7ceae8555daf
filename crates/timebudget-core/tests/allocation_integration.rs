//! Integration tests for the time-budget allocator.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use proptest::prelude::*;
use timebudget_core::{
    allocate, BudgetService, CalendarEvent, DateRange, EfficiencyRecord, Routine, ScheduleDb, Task,
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}

#[test]
fn test_week_with_everything() {
    let range = DateRange::new(date("2025-03-10"), date("2025-03-16"));
    let events = vec![
        CalendarEvent::new("Seminar", at("2025-03-11T10:00:00"), at("2025-03-11T12:00:00")),
        CalendarEvent::new("Dinner", at("2025-03-14T19:00:00"), at("2025-03-14T21:30:00")),
        // outside the range
        CalendarEvent::new("Trip", at("2025-03-17T08:00:00"), at("2025-03-17T18:00:00")),
    ];
    let routines = vec![
        Routine::new("Sleep", 7.0, 1),
        Routine::new("Meals", 2.0, 1),
        Routine::new("Groceries", 1.5, 7),
    ];
    // due at the start of the last day: spread over 6 days
    let tasks = vec![Task::new("Thesis chapter", date("2025-03-16"), NaiveTime::MIN, 12.0)];

    let a = allocate(&range, &events, &routines, &tasks, &[], "Sleep");

    assert_eq!(a.schedule_hours, 4.5);
    assert_eq!(a.sleep_hours, 49.0);
    assert!((a.routine_hours - 15.5).abs() < 1e-9);
    assert!((a.task_hours - 12.0).abs() < 1e-9);
    let expected_free = 168.0 - (4.5 + 49.0 + 15.5 + 12.0);
    assert!((a.free_hours - expected_free).abs() < 1e-9);
    assert!((a.total_hours() - range.total_hours()).abs() < 1e-9);
}

#[test]
fn test_task_due_after_range_is_only_partly_allocated() {
    let range = DateRange::new(date("2025-03-10"), date("2025-03-11"));
    let tasks = vec![Task::new("Long project", date("2025-03-20"), NaiveTime::MIN, 10.0)];
    let a = allocate(&range, &[], &[], &tasks, &[], "Sleep");
    // 10/10 on day one, 9/9 on day two
    assert!((a.task_hours - 2.0).abs() < 1e-9);
}

#[test]
fn test_mean_efficiency_scales_tasks() {
    let range = DateRange::single(date("2025-03-10"));
    let tasks = vec![Task::new("Overdue", date("2025-03-05"), NaiveTime::MIN, 3.0)];
    let d = date("2025-03-01");
    let effs = vec![
        EfficiencyRecord::new(d, d, 0.5),
        EfficiencyRecord::new(d, d, 0.7),
    ];
    let a = allocate(&range, &[], &[], &tasks, &effs, "Sleep");
    assert!((a.task_hours - 5.0).abs() < 1e-9);
}

#[test]
fn test_service_over_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = ScheduleDb::open_at(dir.path().join("budget.db")).unwrap();
    db.insert_routine(&Routine::new("Sleep", 8.0, 1)).unwrap();
    let done = db
        .insert_task(&Task::new("Finished", date("2025-03-01"), NaiveTime::MIN, 5.0))
        .unwrap();
    db.complete_task(done, "proof.pdf").unwrap();

    let report = BudgetService::new(&db, &db)
        .allocate(DateRange::new(date("2025-03-10"), date("2025-03-11")))
        .unwrap();
    assert_eq!(report.allocation.sleep_hours, 16.0);
    // completed tasks are not allocated
    assert_eq!(report.allocation.task_hours, 0.0);
    assert_eq!(report.allocation.free_hours, 32.0);

    drop(db);
    let reopened = ScheduleDb::open_at(dir.path().join("budget.db")).unwrap();
    assert_eq!(reopened.list_routines().unwrap().len(), 1);
}

fn routine_strategy() -> impl Strategy<Value = Routine> {
    ("[A-Za-z]{1,8}", 0.0f64..3.0, 1i64..10)
        .prop_map(|(title, hours, period)| Routine::new(title, hours, period))
}

fn task_strategy() -> impl Strategy<Value = Task> {
    (0i64..40, 0u32..24, 0.0f64..30.0, 0.0f64..120.0).prop_map(|(offset, hour, hours, progress)| {
        let due = date("2025-03-01") + chrono::Duration::days(offset);
        Task::new("t", due, NaiveTime::from_hms_opt(hour, 0, 0).unwrap(), hours)
            .with_progress(progress)
    })
}

proptest! {
    #[test]
    fn prop_buckets_never_negative(
        len in 0i64..14,
        routines in prop::collection::vec(routine_strategy(), 0..4),
        tasks in prop::collection::vec(task_strategy(), 0..6),
        eff in -1.0f64..2.0,
    ) {
        let start = date("2025-03-10");
        let range = DateRange::new(start, start + chrono::Duration::days(len));
        let effs = vec![EfficiencyRecord::new(start, start, eff)];
        let a = allocate(&range, &[], &routines, &tasks, &effs, "Sleep");
        for (_, hours) in a.categories() {
            prop_assert!(hours >= 0.0);
            prop_assert!(hours.is_finite());
        }
    }

    #[test]
    fn prop_buckets_sum_to_range_when_they_fit(
        len in 0i64..10,
        sleep in 0.0f64..10.0,
        other in 0.0f64..4.0,
        event_hours in 0u32..4,
        // (due offset from start, hours, progress); at most 3 tasks of under
        // 2h each, so even all of them landing on one day still fits
        task_specs in prop::collection::vec((0i64..12, 0.0f64..2.0, 0.0f64..1.0), 0..4),
    ) {
        let start = date("2025-03-10");
        let range = DateRange::new(start, start + chrono::Duration::days(len));
        let routines = vec![Routine::new("Sleep", sleep, 1), Routine::new("Chores", other, 1)];
        let events: Vec<CalendarEvent> = range
            .days()
            .map(|d| {
                let begin = d.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
                CalendarEvent::new("Work", begin, begin + chrono::Duration::hours(event_hours as i64))
            })
            .collect();
        let tasks: Vec<Task> = task_specs
            .iter()
            .map(|&(offset, hours, progress)| {
                let due = start + chrono::Duration::days(offset.min(len + 1));
                Task::new("t", due, NaiveTime::MIN, hours).with_progress(progress)
            })
            .collect();
        let a = allocate(&range, &events, &routines, &tasks, &[], "Sleep");
        prop_assert!(a.task_hours >= 0.0);
        prop_assert!((a.total_hours() - range.total_hours()).abs() < 1e-6);
    }
}
