//! Database schema migrations for timebudget.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);
    log::debug!("schema version {current_version}, target {SCHEMA_VERSION}");

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            log::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: records the allocator reads.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS routine (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            hours       REAL NOT NULL,
            period_days INTEGER NOT NULL CHECK (period_days > 0)
        );

        CREATE TABLE IF NOT EXISTS task (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            title          TEXT NOT NULL,
            due_date       TEXT NOT NULL,
            due_time       TEXT NOT NULL,
            required_hours REAL NOT NULL,
            info_url       TEXT,
            progress       REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS task_proof (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id      INTEGER NOT NULL REFERENCES task(id),
            proof_path   TEXT NOT NULL,
            completed_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS efficiency (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            start_date    TEXT NOT NULL,
            end_date      TEXT NOT NULL,
            efficiency    REAL NOT NULL,
            repeat        INTEGER NOT NULL DEFAULT 0,
            interval_days INTEGER
        );

        CREATE TABLE IF NOT EXISTS calendar_event (
            id         TEXT PRIMARY KEY,
            title      TEXT NOT NULL,
            start_at   TEXT NOT NULL,
            end_at     TEXT NOT NULL,
            event_date TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_task_proof_task_id ON task_proof(task_id);
        CREATE INDEX IF NOT EXISTS idx_task_due ON task(due_date, due_time);
        CREATE INDEX IF NOT EXISTS idx_calendar_event_date ON calendar_event(event_date);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: draft events, the recently-deleted bin and event metadata.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS candidate (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            date       TEXT NOT NULL,
            title      TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time   TEXT NOT NULL,
            info_url   TEXT
        );

        CREATE TABLE IF NOT EXISTS candidate_trash (
            id         INTEGER PRIMARY KEY,
            date       TEXT NOT NULL,
            title      TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time   TEXT NOT NULL,
            info_url   TEXT,
            deleted_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS event_meta (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id   TEXT NOT NULL,
            event_date TEXT NOT NULL,
            info_url   TEXT,
            proof_path TEXT,
            UNIQUE (event_id, event_date)
        );

        CREATE INDEX IF NOT EXISTS idx_candidate_date ON candidate(date, start_time);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
