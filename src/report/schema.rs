// Report database schema.
//
// Sheets are caller-defined, so rows are stored generically: the sheet's
// column list once in `report_sheets`, and each row's values as a JSON array
// in `report_rows`. A `schema_version` table tracks migrations.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet. Idempotent.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per sheet; the first appended row fixes the columns
        CREATE TABLE IF NOT EXISTS report_sheets (
            sheet TEXT PRIMARY KEY,
            columns_json TEXT NOT NULL,       -- JSON array of column names
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Append-only rows
        CREATE TABLE IF NOT EXISTS report_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sheet TEXT NOT NULL REFERENCES report_sheets(sheet),
            values_json TEXT NOT NULL,        -- JSON array, same length as columns
            appended_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_rows_sheet
            ON report_rows(sheet);
        ",
    )
    .context("Failed to create report tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Count user tables (for `init` / `status` output).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}
