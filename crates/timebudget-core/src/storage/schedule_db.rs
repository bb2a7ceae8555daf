//! SQLite-based storage for routines, tasks, efficiency records, calendar
//! events and draft candidates.
//!
//! Dates and times are stored as text (`YYYY-MM-DD`, `HH:MM:SS`) and parsed
//! back into typed rows. A row that no longer parses is reported as a
//! validation error naming the row, not silently dropped.

use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::migrations;
use crate::allocation::DateRange;
use crate::calendar::{CalendarEvent, CalendarSource};
use crate::error::{DatabaseError, Result, ValidationError};
use crate::schedule::{
    format_time, parse_date, parse_time, Candidate, CompletedTask, EfficiencyRecord, EventMeta,
    Routine, Task, TaskProof, TrashedCandidate,
};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// === Helper Functions ===

fn parse_datetime(field: &str, value: &str) -> Result<NaiveDateTime, ValidationError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|e| {
        ValidationError::invalid(field, format!("expected YYYY-MM-DDTHH:MM:SS, got '{value}': {e}"))
    })
}

fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Fail with `NotFound` unless exactly the targeted row was touched.
fn expect_changed(changed: usize, entity: &'static str, id: impl ToString) -> Result<()> {
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity,
            id: id.to_string(),
        }
        .into());
    }
    Ok(())
}

fn row_to_routine(row: &Row) -> rusqlite::Result<Routine> {
    Ok(Routine {
        id: row.get("id")?,
        title: row.get("title")?,
        hours: row.get("hours")?,
        period_days: row.get("period_days")?,
    })
}

/// Task columns as stored, before date parsing.
struct TaskRow {
    id: i64,
    title: String,
    due_date: String,
    due_time: String,
    required_hours: f64,
    info_url: Option<String>,
    progress: f64,
}

impl TaskRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            due_date: row.get("due_date")?,
            due_time: row.get("due_time")?,
            required_hours: row.get("required_hours")?,
            info_url: row.get("info_url")?,
            progress: row.get("progress")?,
        })
    }

    fn into_task(self) -> Result<Task, ValidationError> {
        let due_date = parse_date(&format!("task {} due_date", self.id), &self.due_date)?;
        let due_time = parse_time(&format!("task {} due_time", self.id), &self.due_time)?;
        Ok(Task {
            id: self.id,
            title: self.title,
            due_date,
            due_time,
            required_hours: self.required_hours,
            info_url: self.info_url,
            progress: self.progress,
        })
    }
}

struct EfficiencyRow {
    id: i64,
    start_date: String,
    end_date: String,
    efficiency: f64,
    repeat: bool,
    interval_days: Option<i64>,
}

impl EfficiencyRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            efficiency: row.get("efficiency")?,
            repeat: row.get("repeat")?,
            interval_days: row.get("interval_days")?,
        })
    }

    fn into_record(self) -> Result<EfficiencyRecord, ValidationError> {
        Ok(EfficiencyRecord {
            id: self.id,
            start_date: parse_date(&format!("efficiency {} start_date", self.id), &self.start_date)?,
            end_date: parse_date(&format!("efficiency {} end_date", self.id), &self.end_date)?,
            efficiency: self.efficiency,
            repeat: self.repeat,
            interval_days: self.interval_days,
        })
    }
}

struct EventRow {
    id: String,
    title: String,
    start_at: String,
    end_at: String,
}

impl EventRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            start_at: row.get("start_at")?,
            end_at: row.get("end_at")?,
        })
    }

    fn into_event(self) -> Result<CalendarEvent, ValidationError> {
        let start = parse_datetime(&format!("event {} start", self.id), &self.start_at)?;
        let end = parse_datetime(&format!("event {} end", self.id), &self.end_at)?;
        Ok(CalendarEvent {
            id: self.id,
            title: self.title,
            start,
            end,
        })
    }
}

/// Candidate columns; also used for the trash table, which adds `deleted_at`.
struct CandidateRow {
    id: i64,
    date: String,
    title: String,
    start_time: String,
    end_time: String,
    info_url: Option<String>,
}

impl CandidateRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            date: row.get("date")?,
            title: row.get("title")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            info_url: row.get("info_url")?,
        })
    }

    fn into_candidate(self) -> Result<Candidate, ValidationError> {
        Ok(Candidate {
            id: self.id,
            date: parse_date(&format!("candidate {} date", self.id), &self.date)?,
            title: self.title,
            start_time: parse_time(&format!("candidate {} start_time", self.id), &self.start_time)?,
            end_time: parse_time(&format!("candidate {} end_time", self.id), &self.end_time)?,
            info_url: self.info_url,
        })
    }
}

/// Copy a candidate into the trash table and remove it. Runs inside the
/// caller's transaction.
fn trash_candidate(conn: &Connection, id: i64) -> Result<()> {
    let moved = conn.execute(
        "INSERT INTO candidate_trash (id, date, title, start_time, end_time, info_url, deleted_at)
         SELECT id, date, title, start_time, end_time, info_url, ?2
         FROM candidate WHERE id = ?1",
        params![id, now_rfc3339()],
    )?;
    expect_changed(moved, "candidate", id)?;
    conn.execute("DELETE FROM candidate WHERE id = ?1", params![id])?;
    Ok(())
}

fn collect<R, T>(
    rows: impl Iterator<Item = rusqlite::Result<R>>,
    convert: impl Fn(R) -> Result<T, ValidationError>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(convert(row?)?);
    }
    Ok(out)
}

/// SQLite database for schedule records.
pub struct ScheduleDb {
    conn: Connection,
}

impl ScheduleDb {
    /// Open (or create) the database at `path` and apply migrations.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("opened database at {}", path.display());
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // === Routines ===

    pub fn insert_routine(&self, routine: &Routine) -> Result<i64> {
        routine.validate()?;
        self.conn.execute(
            "INSERT INTO routine (title, hours, period_days) VALUES (?1, ?2, ?3)",
            params![routine.title, routine.hours, routine.period_days],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_routine(&self, id: i64) -> Result<Option<Routine>> {
        let routine = self
            .conn
            .query_row(
                "SELECT * FROM routine WHERE id = ?1",
                params![id],
                row_to_routine,
            )
            .optional()?;
        Ok(routine)
    }

    /// All routines, newest first.
    pub fn list_routines(&self) -> Result<Vec<Routine>> {
        let mut stmt = self.conn.prepare("SELECT * FROM routine ORDER BY id DESC")?;
        let rows = stmt.query_map([], row_to_routine)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_routine(&self, routine: &Routine) -> Result<()> {
        routine.validate()?;
        let changed = self.conn.execute(
            "UPDATE routine SET title = ?1, hours = ?2, period_days = ?3 WHERE id = ?4",
            params![routine.title, routine.hours, routine.period_days, routine.id],
        )?;
        expect_changed(changed, "routine", routine.id)
    }

    pub fn delete_routine(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM routine WHERE id = ?1", params![id])?;
        expect_changed(changed, "routine", id)
    }

    // === Tasks ===

    pub fn insert_task(&self, task: &Task) -> Result<i64> {
        task.validate()?;
        self.conn.execute(
            "INSERT INTO task (title, due_date, due_time, required_hours, info_url, progress)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.title,
                task.due_date.to_string(),
                format_time(task.due_time),
                task.required_hours,
                task.info_url,
                task.progress,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let row = self
            .conn
            .query_row("SELECT * FROM task WHERE id = ?1", params![id], TaskRow::from_row)
            .optional()?;
        match row {
            Some(row) => Ok(Some(row.into_task()?)),
            None => Ok(None),
        }
    }

    /// Tasks without a completion proof, earliest deadline first.
    ///
    /// # Errors
    /// Fails with a validation error if any active task has an unparsable
    /// due date or time.
    pub fn list_active_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.* FROM task AS t
             WHERE NOT EXISTS (SELECT 1 FROM task_proof AS p WHERE p.task_id = t.id)
             ORDER BY t.due_date ASC, t.due_time ASC, t.id ASC",
        )?;
        let rows = stmt.query_map([], TaskRow::from_row)?;
        collect(rows, TaskRow::into_task)
    }

    /// Tasks with at least one proof, most recently completed first.
    pub fn list_completed_tasks(&self) -> Result<Vec<CompletedTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.*,
                    (SELECT MAX(p.completed_at) FROM task_proof AS p WHERE p.task_id = t.id)
                        AS completed_at
             FROM task AS t
             WHERE EXISTS (SELECT 1 FROM task_proof AS p WHERE p.task_id = t.id)
             ORDER BY completed_at DESC, t.id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((TaskRow::from_row(row)?, row.get::<_, String>("completed_at")?))
        })?;
        collect(rows, |(task, completed_at)| {
            Ok(CompletedTask {
                task: task.into_task()?,
                completed_at,
            })
        })
    }

    pub fn update_task(&self, task: &Task) -> Result<()> {
        task.validate()?;
        let changed = self.conn.execute(
            "UPDATE task SET title = ?1, due_date = ?2, due_time = ?3, required_hours = ?4,
                             info_url = ?5, progress = ?6
             WHERE id = ?7",
            params![
                task.title,
                task.due_date.to_string(),
                format_time(task.due_time),
                task.required_hours,
                task.info_url,
                task.progress,
                task.id,
            ],
        )?;
        expect_changed(changed, "task", task.id)
    }

    /// Store progress as a fraction. Percentages are normalized first.
    pub fn set_task_progress(&self, id: i64, progress: f64) -> Result<()> {
        let progress = crate::schedule::normalize_progress(progress);
        let changed = self.conn.execute(
            "UPDATE task SET progress = ?1 WHERE id = ?2",
            params![progress, id],
        )?;
        expect_changed(changed, "task", id)
    }

    /// Delete a task along with its proofs.
    pub fn delete_task(&self, id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM task_proof WHERE task_id = ?1", params![id])?;
        let changed = tx.execute("DELETE FROM task WHERE id = ?1", params![id])?;
        expect_changed(changed, "task", id)?;
        tx.commit()?;
        Ok(())
    }

    /// Record a completion proof, which moves the task to the completed list.
    pub fn complete_task(&self, task_id: i64, proof_path: &str) -> Result<i64> {
        if self.get_task(task_id)?.is_none() {
            return Err(DatabaseError::NotFound {
                entity: "task",
                id: task_id.to_string(),
            }
            .into());
        }
        self.conn.execute(
            "INSERT INTO task_proof (task_id, proof_path, completed_at) VALUES (?1, ?2, ?3)",
            params![task_id, proof_path, now_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_task_proofs(&self, task_id: i64) -> Result<Vec<TaskProof>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, proof_path, completed_at FROM task_proof
             WHERE task_id = ?1 ORDER BY completed_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![task_id], |row| {
            Ok(TaskProof {
                id: row.get(0)?,
                task_id: row.get(1)?,
                proof_path: row.get(2)?,
                completed_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // === Efficiency ===

    pub fn insert_efficiency(&self, record: &EfficiencyRecord) -> Result<i64> {
        record.validate()?;
        self.conn.execute(
            "INSERT INTO efficiency (start_date, end_date, efficiency, repeat, interval_days)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.start_date.to_string(),
                record.end_date.to_string(),
                record.efficiency,
                record.repeat,
                record.interval_days,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_efficiency(&self, id: i64) -> Result<Option<EfficiencyRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT * FROM efficiency WHERE id = ?1",
                params![id],
                EfficiencyRow::from_row,
            )
            .optional()?;
        match row {
            Some(row) => Ok(Some(row.into_record()?)),
            None => Ok(None),
        }
    }

    /// All efficiency records, latest start first.
    pub fn list_efficiency(&self) -> Result<Vec<EfficiencyRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM efficiency ORDER BY start_date DESC, id DESC")?;
        let rows = stmt.query_map([], EfficiencyRow::from_row)?;
        collect(rows, EfficiencyRow::into_record)
    }

    pub fn update_efficiency(&self, record: &EfficiencyRecord) -> Result<()> {
        record.validate()?;
        let changed = self.conn.execute(
            "UPDATE efficiency
                SET start_date = ?1, end_date = ?2, efficiency = ?3, repeat = ?4, interval_days = ?5
              WHERE id = ?6",
            params![
                record.start_date.to_string(),
                record.end_date.to_string(),
                record.efficiency,
                record.repeat,
                record.interval_days,
                record.id,
            ],
        )?;
        expect_changed(changed, "efficiency record", record.id)
    }

    pub fn delete_efficiency(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM efficiency WHERE id = ?1", params![id])?;
        expect_changed(changed, "efficiency record", id)
    }

    // === Calendar events ===

    pub fn insert_event(&self, event: &CalendarEvent) -> Result<()> {
        event.validate()?;
        self.conn.execute(
            "INSERT INTO calendar_event (id, title, start_at, end_at, event_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id,
                event.title,
                format_datetime(event.start),
                format_datetime(event.end),
                event.date().to_string(),
            ],
        )?;
        Ok(())
    }

    /// Events starting within `range`, in start order.
    pub fn list_events(&self, range: &DateRange) -> Result<Vec<CalendarEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, start_at, end_at FROM calendar_event
             WHERE event_date >= ?1 AND event_date <= ?2
             ORDER BY start_at ASC",
        )?;
        let rows = stmt.query_map(
            params![range.start.to_string(), range.end.to_string()],
            EventRow::from_row,
        )?;
        collect(rows, EventRow::into_event)
    }

    pub fn delete_event(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM calendar_event WHERE id = ?1", params![id])?;
        expect_changed(changed, "event", id)
    }

    /// Insert or replace the metadata attached to an event on a day.
    pub fn upsert_event_meta(
        &self,
        event_id: &str,
        event_date: NaiveDate,
        info_url: Option<&str>,
        proof_path: Option<&str>,
    ) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO event_meta (event_id, event_date, info_url, proof_path)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (event_id, event_date)
             DO UPDATE SET info_url = excluded.info_url, proof_path = excluded.proof_path
             RETURNING id",
            params![event_id, event_date.to_string(), info_url, proof_path],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn event_meta_on(&self, event_date: NaiveDate) -> Result<Vec<EventMeta>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, event_date, info_url, proof_path FROM event_meta
             WHERE event_date = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![event_date.to_string()], |row| {
            Ok(EventMeta {
                id: row.get(0)?,
                event_id: row.get(1)?,
                event_date,
                info_url: row.get(3)?,
                proof_path: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // === Candidates ===

    pub fn insert_candidate(&self, candidate: &Candidate) -> Result<i64> {
        candidate.validate()?;
        self.conn.execute(
            "INSERT INTO candidate (date, title, start_time, end_time, info_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                candidate.date.to_string(),
                candidate.title,
                format_time(candidate.start_time),
                format_time(candidate.end_time),
                candidate.info_url,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        let row = self
            .conn
            .query_row(
                "SELECT * FROM candidate WHERE id = ?1",
                params![id],
                CandidateRow::from_row,
            )
            .optional()?;
        match row {
            Some(row) => Ok(Some(row.into_candidate()?)),
            None => Ok(None),
        }
    }

    pub fn list_candidates_on(&self, date: NaiveDate) -> Result<Vec<Candidate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM candidate WHERE date = ?1 ORDER BY start_time ASC")?;
        let rows = stmt.query_map(params![date.to_string()], CandidateRow::from_row)?;
        collect(rows, CandidateRow::into_candidate)
    }

    pub fn update_candidate(&self, candidate: &Candidate) -> Result<()> {
        candidate.validate()?;
        let changed = self.conn.execute(
            "UPDATE candidate SET date = ?1, title = ?2, start_time = ?3, end_time = ?4, info_url = ?5
             WHERE id = ?6",
            params![
                candidate.date.to_string(),
                candidate.title,
                format_time(candidate.start_time),
                format_time(candidate.end_time),
                candidate.info_url,
                candidate.id,
            ],
        )?;
        expect_changed(changed, "candidate", candidate.id)
    }

    /// Move a candidate to the recently-deleted bin.
    pub fn delete_candidate(&self, id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        trash_candidate(&tx, id)?;
        tx.commit()?;
        Ok(())
    }

    /// Recently deleted candidates, newest deletion first. With
    /// `max_age_days`, only drafts deleted within that many days are listed.
    pub fn list_trash(
        &self,
        limit: usize,
        max_age_days: Option<u32>,
    ) -> Result<Vec<TrashedCandidate>> {
        // deleted_at is always written by `to_rfc3339` in UTC, so the text
        // order matches the time order.
        let cutoff = max_age_days
            .map(|days| (Utc::now() - Duration::days(i64::from(days))).to_rfc3339());
        let mut stmt = self.conn.prepare(
            "SELECT * FROM candidate_trash
             WHERE ?1 IS NULL OR deleted_at >= ?1
             ORDER BY deleted_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![cutoff, limit as i64], |row| {
            Ok((CandidateRow::from_row(row)?, row.get::<_, String>("deleted_at")?))
        })?;
        collect(rows, |(candidate, deleted_at)| {
            Ok(TrashedCandidate {
                candidate: candidate.into_candidate()?,
                deleted_at,
            })
        })
    }

    /// Permanently remove a draft from the bin.
    pub fn purge_trash(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM candidate_trash WHERE id = ?1", params![id])?;
        expect_changed(changed, "trashed candidate", id)
    }

    /// Move a trashed candidate back, keeping its original id.
    pub fn restore_candidate(&self, id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let restored = tx.execute(
            "INSERT INTO candidate (id, date, title, start_time, end_time, info_url)
             SELECT id, date, title, start_time, end_time, info_url
             FROM candidate_trash WHERE id = ?1",
            params![id],
        )?;
        expect_changed(restored, "trashed candidate", id)?;
        tx.execute("DELETE FROM candidate_trash WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    /// Commit a candidate to the calendar and move the draft to the bin.
    pub fn promote_candidate(&self, id: i64) -> Result<CalendarEvent> {
        let candidate = self.get_candidate(id)?.ok_or(DatabaseError::NotFound {
            entity: "candidate",
            id: id.to_string(),
        })?;
        let event = CalendarEvent::new(
            candidate.title.clone(),
            candidate.date.and_time(candidate.start_time),
            candidate.date.and_time(candidate.end_time),
        );
        let tx = self.conn.unchecked_transaction()?;
        self.insert_event(&event)?;
        trash_candidate(&tx, id)?;
        tx.commit()?;
        log::info!("promoted candidate {id} to event {}", event.id);
        Ok(event)
    }
}

impl CalendarSource for ScheduleDb {
    fn name(&self) -> &str {
        "local"
    }

    fn events_on(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>> {
        self.list_events(&DateRange::single(date))
    }
}
