// In-memory report sink. Same column rules as the SQLite sink, nothing
// persisted.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{check_width, ReportSink, ReportValue, SheetSummary, StoredRow};

#[derive(Default)]
struct Sheets {
    columns: HashMap<String, Vec<String>>,
    rows: Vec<StoredRow>,
}

#[derive(Default)]
pub struct MemoryReportSink {
    inner: Mutex<Sheets>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row of one sheet, oldest first.
    pub async fn rows(&self, sheet: &str) -> Vec<StoredRow> {
        let inner = self.inner.lock().await;
        inner.rows.iter().filter(|r| r.sheet == sheet).cloned().collect()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn append_row(&self, sheet: &str, columns: &[String], row: &[ReportValue]) -> Result<()> {
        check_width(sheet, columns, row)?;

        let mut inner = self.inner.lock().await;
        match inner.columns.get(sheet) {
            Some(existing) if existing.as_slice() != columns => {
                anyhow::bail!("Sheet {sheet} already has different columns");
            }
            Some(_) => {}
            None => {
                inner.columns.insert(sheet.to_string(), columns.to_vec());
            }
        }

        inner.rows.push(StoredRow {
            sheet: sheet.to_string(),
            columns: columns.to_vec(),
            values: row.to_vec(),
            appended_at: chrono::Utc::now().to_rfc3339(),
        });
        Ok(())
    }

    async fn recent_rows(&self, sheet_prefix: Option<&str>, limit: u32) -> Result<Vec<StoredRow>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rows
            .iter()
            .rev()
            .filter(|r| sheet_prefix.map_or(true, |p| r.sheet.starts_with(p)))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn sheets(&self) -> Result<Vec<SheetSummary>> {
        let inner = self.inner.lock().await;
        let mut sheets: Vec<SheetSummary> = inner
            .columns
            .keys()
            .map(|sheet| SheetSummary {
                sheet: sheet.clone(),
                rows: inner.rows.iter().filter(|r| &r.sheet == sheet).count() as i64,
            })
            .collect();
        sheets.sort_by(|a, b| a.sheet.cmp(&b.sheet));
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
        let sink = MemoryReportSink::new();
        let columns = cols(&["a", "b"]);
        sink.append_row("s", &columns, &[ReportValue::from("x"), ReportValue::from(1.5)]).await.unwrap();
        sink.append_row("s", &columns, &[ReportValue::from("y"), ReportValue::from(2.5)]).await.unwrap();

        let recent = sink.recent_rows(None, 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].get("a"), Some(&ReportValue::from("y")));
        assert_eq!(sink.rows("s").await.len(), 2);
    }

    #[tokio::test]
    async fn test_column_mismatch_rejected() {
        let sink = MemoryReportSink::new();
        sink.append_row("s", &cols(&["a"]), &[ReportValue::from("x")]).await.unwrap();
        assert!(sink.append_row("s", &cols(&["b"]), &[ReportValue::from("x")]).await.is_err());
        assert!(sink.append_row("s", &cols(&["a"]), &[]).await.is_err());
    }
}
