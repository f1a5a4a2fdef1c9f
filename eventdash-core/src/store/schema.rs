//! Local store schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! Every entity table has the same shape: key columns for filtering plus the
//! full row as a JSON document in `data`.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Event and entity tables
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS event_tickets (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS event_attendees (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS event_sessions (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS event_checkins (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS event_b2b_meetings (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS event_feedback_responses (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS event_exhibitors (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE TABLE IF NOT EXISTS event_sponsors (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tickets_event ON event_tickets(event_id);
    CREATE INDEX IF NOT EXISTS idx_attendees_event ON event_attendees(event_id);
    CREATE INDEX IF NOT EXISTS idx_sessions_event ON event_sessions(event_id);
    CREATE INDEX IF NOT EXISTS idx_checkins_event ON event_checkins(event_id);
    CREATE INDEX IF NOT EXISTS idx_meetings_event ON event_b2b_meetings(event_id);
    CREATE INDEX IF NOT EXISTS idx_feedback_event ON event_feedback_responses(event_id);
    CREATE INDEX IF NOT EXISTS idx_exhibitors_event ON event_exhibitors(event_id);
    CREATE INDEX IF NOT EXISTS idx_sponsors_event ON event_sponsors(event_id);
    "#,
    // Version 2: Activity log for the overview feed
    r#"
    CREATE TABLE IF NOT EXISTS event_activity_log (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        created_at  DATETIME NOT NULL,
        data        JSON NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_activity_event_created
        ON event_activity_log(event_id, created_at DESC);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
