//! # Report Exporter
//! Payout reports over the *full* author aggregate set (table search,
//! filters and paging do not apply).
//!
//! Targets: PDF download, CSV download, remote spreadsheet append. A single
//! busy flag makes exports mutually exclusive; each target fails on its own
//! without touching the others.

pub mod csv;
pub mod pdf;
pub mod sheets;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::{self, AuthorAggregate};
use sheets::{SheetRow, SheetSink};

pub const PDF_FILENAME: &str = "payout-report.pdf";
pub const CSV_FILENAME: &str = "payout-report.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("another export is already in progress")]
    Busy,
    #[error("CSV export failed: {0}")]
    Csv(String),
    #[error("PDF export failed: {0}")]
    Pdf(String),
    #[error("spreadsheet export failed: {0}")]
    Sheets(String),
    #[error("spreadsheet export is not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTarget {
    Pdf,
    Csv,
    Sheets,
}

impl ExportTarget {
    fn as_str(&self) -> &'static str {
        match self {
            ExportTarget::Pdf => "pdf",
            ExportTarget::Csv => "csv",
            ExportTarget::Sheets => "sheets",
        }
    }
}

/// Transient user-facing message about an export outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub success: bool,
    pub message: String,
}

impl Notification {
    pub fn for_result<T>(target: ExportTarget, res: &Result<T, ExportError>) -> Self {
        match res {
            Ok(_) => Self {
                success: true,
                message: match target {
                    ExportTarget::Pdf => "PDF exported successfully".to_string(),
                    ExportTarget::Csv => "CSV exported successfully".to_string(),
                    ExportTarget::Sheets => "Successfully exported to Google Sheets".to_string(),
                },
            },
            Err(ExportError::Busy) => Self {
                success: false,
                message: "An export is already in progress".to_string(),
            },
            Err(_) => Self {
                success: false,
                message: match target {
                    ExportTarget::Pdf => "Failed to export PDF".to_string(),
                    ExportTarget::Csv => "Failed to export CSV".to_string(),
                    ExportTarget::Sheets => "Failed to export to Google Sheets".to_string(),
                },
            },
        }
    }
}

/// A generated downloadable file.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Clears the busy flag on drop, including on early return or panic.
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Exporter {
    busy: AtomicBool,
    sheets: Option<Arc<dyn SheetSink>>,
}

impl Exporter {
    pub fn new(sheets: Option<Arc<dyn SheetSink>>) -> Self {
        Self {
            busy: AtomicBool::new(false),
            sheets,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the busy flag, or fail if an export is already running.
    pub fn try_begin(&self) -> Result<BusyGuard<'_>, ExportError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::Busy)?;
        Ok(BusyGuard { flag: &self.busy })
    }

    pub fn export_csv(&self, rows: &[AuthorAggregate]) -> Result<ExportFile, ExportError> {
        let _guard = self.try_begin()?;
        let res = csv::render(rows, aggregate::totals(rows)).map(|bytes| ExportFile {
            filename: CSV_FILENAME,
            content_type: "text/csv; charset=utf-8",
            bytes,
        });
        record(ExportTarget::Csv, rows.len(), &res);
        res
    }

    pub fn export_pdf(&self, rows: &[AuthorAggregate]) -> Result<ExportFile, ExportError> {
        let _guard = self.try_begin()?;
        let res = pdf::render(rows, aggregate::totals(rows)).map(|bytes| ExportFile {
            filename: PDF_FILENAME,
            content_type: "application/pdf",
            bytes,
        });
        record(ExportTarget::Pdf, rows.len(), &res);
        res
    }

    /// Append one row per author, stamped with `captured_on`.
    pub async fn export_sheets(
        &self,
        rows: &[AuthorAggregate],
        captured_on: NaiveDate,
    ) -> Result<usize, ExportError> {
        let _guard = self.try_begin()?;
        let res = match &self.sheets {
            None => Err(ExportError::NotConfigured),
            Some(sink) => {
                let date = sheets::capture_date(captured_on);
                let out: Vec<SheetRow> = rows.iter().map(|r| SheetRow::from_aggregate(r, &date)).collect();
                sink.append_rows(&out)
                    .await
                    .map_err(|e| ExportError::Sheets(format!("{e:#}")))
            }
        };
        record(ExportTarget::Sheets, rows.len(), &res);
        res
    }
}

fn record<T>(target: ExportTarget, rows: usize, res: &Result<T, ExportError>) {
    match res {
        Ok(_) => {
            counter!("export_total", "target" => target.as_str()).increment(1);
            info!(target: "export", kind = target.as_str(), rows, "export finished");
        }
        Err(ExportError::Busy) => {}
        Err(e) => {
            counter!("export_errors_total", "target" => target.as_str()).increment(1);
            warn!(target: "export", kind = target.as_str(), error = %e, "export failed");
        }
    }
}

/// `$1234.50` style amount used by every report format.
pub fn format_money(v: f64) -> String {
    format!("${v:.2}")
}
