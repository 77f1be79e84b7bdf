// Report sink: append-only tabular log of evaluated pairs.
//
// A report is a set of named sheets. Each sheet has a fixed column list set
// by its first row; every later row must match it. Two sheet kinds are
// written per pair (see rows.rs): a profile summary and a classification
// result.
//
// Backends: SQLite (the default, persisted, serialized writes) and an
// in-memory sink for tests and `--features` builds without SQLite.

pub mod memory;
pub mod rows;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::MemoryReportSink;
pub use rows::ReportValue;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteReportSink;

/// A row as read back from a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub sheet: String,
    pub columns: Vec<String>,
    pub values: Vec<ReportValue>,
    pub appended_at: String,
}

impl StoredRow {
    /// Value under a column name, if the sheet has that column.
    pub fn get(&self, column: &str) -> Option<&ReportValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }
}

/// Name and size of one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSummary {
    pub sheet: String,
    pub rows: i64,
}

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Append one row. The first row of a sheet fixes its columns.
    async fn append_row(&self, sheet: &str, columns: &[String], row: &[ReportValue]) -> Result<()>;

    /// Most recent rows first, optionally only from sheets starting with
    /// `sheet_prefix`.
    async fn recent_rows(&self, sheet_prefix: Option<&str>, limit: u32) -> Result<Vec<StoredRow>>;

    async fn sheets(&self) -> Result<Vec<SheetSummary>>;
}

/// Reject rows whose width doesn't match the column list.
pub(crate) fn check_width(sheet: &str, columns: &[String], row: &[ReportValue]) -> Result<()> {
    if columns.len() != row.len() {
        anyhow::bail!(
            "Row for sheet {sheet} has {} values but {} columns",
            row.len(),
            columns.len()
        );
    }
    Ok(())
}
