// SqliteReportSink: rusqlite backend for the report sink.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync,
// which also serializes concurrent writers from a batch run. Each method
// locks, does synchronous rusqlite work, and returns; the lock is never held
// across an .await on anything else.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use super::schema;
use super::{check_width, ReportSink, ReportValue, SheetSummary, StoredRow};

pub struct SqliteReportSink {
    conn: Mutex<Connection>,
}

impl SqliteReportSink {
    /// Wrap an already-opened connection whose tables exist.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (or create) the database file and run schema setup.
    pub fn initialize(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for database: {db_path}")
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {db_path}"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        schema::create_tables(&conn)?;

        Ok(Self::new(conn))
    }

    /// Open an existing database; fails if `init` hasn't been run.
    pub fn open(db_path: &str) -> Result<Self> {
        if !Path::new(db_path).exists() {
            anyhow::bail!("Database not found at {db_path}. Run `crossmatch init` first.");
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {db_path}"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self::new(conn))
    }

    /// In-memory database with tables created, for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::create_tables(&conn)?;
        Ok(Self::new(conn))
    }

    pub async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        schema::table_count(&conn)
    }

    pub async fn schema_version(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        schema::schema_version(&conn)
    }
}

#[async_trait]
impl ReportSink for SqliteReportSink {
    async fn append_row(&self, sheet: &str, columns: &[String], row: &[ReportValue]) -> Result<()> {
        check_width(sheet, columns, row)?;
        let columns_json = serde_json::to_string(columns)?;
        let values_json = serde_json::to_string(row)?;

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT columns_json FROM report_sheets WHERE sheet = ?1",
                [sheet],
                |r| r.get(0),
            )
            .optional()?;

        match existing {
            Some(json) => {
                let stored: Vec<String> = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt column list for sheet {sheet}"))?;
                if stored.as_slice() != columns {
                    anyhow::bail!("Sheet {sheet} already has different columns");
                }
            }
            None => {
                tx.execute(
                    "INSERT INTO report_sheets (sheet, columns_json) VALUES (?1, ?2)",
                    params![sheet, columns_json],
                )?;
            }
        }

        tx.execute(
            "INSERT INTO report_rows (sheet, values_json) VALUES (?1, ?2)",
            params![sheet, values_json],
        )?;
        tx.commit().context("Failed to append report row")?;
        Ok(())
    }

    async fn recent_rows(&self, sheet_prefix: Option<&str>, limit: u32) -> Result<Vec<StoredRow>> {
        let conn = self.conn.lock().await;
        let pattern = format!("{}%", sheet_prefix.unwrap_or(""));

        let mut stmt = conn.prepare(
            "SELECT r.sheet, s.columns_json, r.values_json, r.appended_at
             FROM report_rows r
             JOIN report_sheets s ON s.sheet = r.sheet
             WHERE r.sheet LIKE ?1
             ORDER BY r.id DESC
             LIMIT ?2",
        )?;

        let raw = stmt
            .query_map(params![pattern, limit], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(sheet, columns_json, values_json, appended_at)| {
                Ok(StoredRow {
                    columns: serde_json::from_str(&columns_json)
                        .with_context(|| format!("Corrupt column list for sheet {sheet}"))?,
                    values: serde_json::from_str(&values_json)
                        .with_context(|| format!("Corrupt row in sheet {sheet}"))?,
                    sheet,
                    appended_at,
                })
            })
            .collect()
    }

    async fn sheets(&self) -> Result<Vec<SheetSummary>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT s.sheet, COUNT(r.id)
             FROM report_sheets s
             LEFT JOIN report_rows r ON r.sheet = s.sheet
             GROUP BY s.sheet
             ORDER BY s.sheet",
        )?;
        let sheets = stmt
            .query_map([], |r| {
                Ok(SheetSummary {
                    sheet: r.get(0)?,
                    rows: r.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sheets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let sink = SqliteReportSink::in_memory().unwrap();
        let columns = cols(&["id", "score", "verdict"]);
        sink.append_row(
            "svm_prediction_output_facebook_twitter",
            &columns,
            &[ReportValue::from("alice"), ReportValue::Real(0.75), ReportValue::Null],
        )
        .await
        .unwrap();

        let rows = sink.recent_rows(Some("svm_"), 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns, columns);
        assert_eq!(rows[0].get("score"), Some(&ReportValue::Real(0.75)));
        assert_eq!(rows[0].get("verdict"), Some(&ReportValue::Null));
    }

    #[tokio::test]
    async fn test_recent_rows_newest_first_and_filtered() {
        let sink = SqliteReportSink::in_memory().unwrap();
        let columns = cols(&["n"]);
        for n in 0..3i64 {
            sink.append_row("svm_a", &columns, &[ReportValue::Int(n)]).await.unwrap();
        }
        sink.append_row("Profile_a", &columns, &[ReportValue::Int(9)]).await.unwrap();

        let rows = sink.recent_rows(Some("svm_"), 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values, vec![ReportValue::Int(2)]);
        assert_eq!(rows[1].values, vec![ReportValue::Int(1)]);

        let all = sink.recent_rows(None, 10).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_column_mismatch_rejected() {
        let sink = SqliteReportSink::in_memory().unwrap();
        sink.append_row("s", &cols(&["a"]), &[ReportValue::Int(1)]).await.unwrap();
        assert!(sink
            .append_row("s", &cols(&["b"]), &[ReportValue::Int(1)])
            .await
            .is_err());
        assert!(sink.append_row("s", &cols(&["a"]), &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_sheet_summary() {
        let sink = SqliteReportSink::in_memory().unwrap();
        sink.append_row("b", &cols(&["x"]), &[ReportValue::Int(1)]).await.unwrap();
        sink.append_row("a", &cols(&["x"]), &[ReportValue::Int(1)]).await.unwrap();
        sink.append_row("a", &cols(&["x"]), &[ReportValue::Int(2)]).await.unwrap();

        let sheets = sink.sheets().await.unwrap();
        assert_eq!(
            sheets,
            vec![
                SheetSummary { sheet: "a".into(), rows: 2 },
                SheetSummary { sheet: "b".into(), rows: 1 },
            ]
        );
        assert_eq!(sink.table_count().await.unwrap(), 3);
    }
}
