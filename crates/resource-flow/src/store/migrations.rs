//! Numbered SQL migrations embedded at compile time.
//!
//! Each migration runs once and is recorded in `schema_version`.

use rusqlite::Connection;

use super::StoreError;

struct Migration {
    version: i32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/001_baseline.sql"),
}];

fn ensure_schema_version_table(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;
    Ok(())
}

pub(crate) fn current_version(conn: &Connection) -> Result<i32, StoreError> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Applies every pending migration and returns how many ran.
///
/// A database whose version is newer than the newest known migration is rejected.
pub fn run_migrations(conn: &Connection) -> Result<usize, StoreError> {
    ensure_schema_version_table(conn)?;

    let current = current_version(conn)?;
    let max_known = MIGRATIONS.last().map_or(0, |migration| migration.version);
    if current > max_known {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than the supported version {max_known}"
        )));
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .collect();

    for migration in &pending {
        conn.execute_batch(migration.sql).map_err(|err| {
            StoreError::Migration(format!("v{} failed: {}", migration.version, err))
        })?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )?;
        tracing::info!(version = migration.version, "applied migration");
    }

    Ok(pending.len())
}
