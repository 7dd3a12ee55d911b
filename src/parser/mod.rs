//! Spreadsheet and API payload parsing
//!
//! Everything that enters the wizard as data ends up as a list of
//! [`Record`]s: one ordered column → value map per row.

mod delimited;
mod excel;
mod json;

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::ImportError;

pub use json::records_from_json;

/// One row, keyed by column header
pub type Record = BTreeMap<String, String>;

/// Accepted upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xls,
    Xlsx,
}

impl SourceFormat {
    pub const ACCEPTED: &'static [&'static str] = &[".csv", ".xls", ".xlsx"];

    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(SourceFormat::Csv),
            Some("xls") => Ok(SourceFormat::Xls),
            Some("xlsx") => Ok(SourceFormat::Xlsx),
            _ => Err(ImportError::Parse(format!(
                "unsupported file '{}', expected one of {}",
                path.display(),
                Self::ACCEPTED.join(", ")
            ))),
        }
    }
}

/// A single sheet with its header row split off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Rows keyed by header; blank rows are dropped
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|row| {
                self.headers
                    .iter()
                    .enumerate()
                    .filter(|(_, header)| !header.trim().is_empty())
                    .map(|(idx, header)| {
                        let value = row.get(idx).cloned().unwrap_or_default();
                        (header.trim().to_string(), value.trim().to_string())
                    })
                    .collect()
            })
            .collect()
    }
}

/// Header rows must name each non-blank column once
fn check_headers(sheet: &str, headers: &[String]) -> Result<(), ImportError> {
    let mut seen = HashSet::new();
    for header in headers.iter().map(|h| h.trim()).filter(|h| !h.is_empty()) {
        if !seen.insert(header) {
            return Err(ImportError::Parse(format!(
                "sheet '{}' has more than one column named '{}'",
                sheet, header
            )));
        }
    }
    Ok(())
}

/// Parsed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workbook {
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn rows(&self, sheet_name: &str) -> Option<Vec<Record>> {
        self.sheet(sheet_name).map(Sheet::records)
    }
}

/// Turns an uploaded file into sheets and records
#[async_trait]
pub trait FileParser: Send + Sync {
    async fn parse(&self, path: &Path) -> Result<Workbook, ImportError>;
}

/// calamine/csv backed parser; parsing runs on the blocking pool
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetParser;

impl SpreadsheetParser {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous parse, used by the async wrapper and the CLI
    pub fn parse_blocking(path: &Path) -> Result<Workbook, ImportError> {
        let format = SourceFormat::from_path(path)?;

        let sheets = match format {
            SourceFormat::Csv => vec![delimited::read_csv(path)?],
            SourceFormat::Xls | SourceFormat::Xlsx => excel::read_workbook(path)?,
        };

        if sheets.is_empty() {
            return Err(ImportError::Parse(format!(
                "'{}' contains no sheets",
                path.display()
            )));
        }

        log::debug!(
            "Parsed {} ({:?}) with {} sheet(s)",
            path.display(),
            format,
            sheets.len()
        );

        Ok(Workbook {
            path: path.to_path_buf(),
            sheets,
        })
    }
}

#[async_trait]
impl FileParser for SpreadsheetParser {
    async fn parse(&self, path: &Path) -> Result<Workbook, ImportError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::parse_blocking(&path))
            .await
            .map_err(|e| ImportError::Parse(format!("parser task failed: {}", e)))?
    }
}
