// 📂 Loader - multi-sheet workbook → one flat table
//
// The disposition workbook ships one sheet per group of states. Every sheet
// has the same 11-column layout; we concatenate them in sheet order.
// Columns are positional: the header text is kept only for diagnostics.

use crate::error::{PipelineError, Result};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Number of columns every sheet must carry
pub const EXPECTED_COLUMNS: usize = 11;

// ============================================================================
// RAW TYPES
// ============================================================================

/// A spreadsheet cell before any coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Spreadsheet date serial (days since 1899-12-30, fraction = time of day)
    DateTime(f64),
    /// ISO 8601 date/time text from .ods files
    DateTimeIso(String),
    Error(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering of the cell, None when empty
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) => Some(f.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::DateTime(serial) => Some(serial.to_string()),
            Cell::DateTimeIso(s) => Some(s.clone()),
            Cell::Error(e) => Some(e.clone()),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) => Cell::DateTimeIso(s.clone()),
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Error(format!("{:?}", e)),
        }
    }
}

/// One data row with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub sheet: String,
    /// 1-based row number inside the sheet (header is row 1)
    pub row_number: usize,
    pub cells: Vec<Cell>,
}

/// All sheets concatenated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Header of the first non-empty sheet
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// WORKBOOK SOURCE
// ============================================================================

/// Anything that can hand out named sheets as rows of cells
pub trait WorkbookSource {
    fn sheet_names(&self) -> Vec<String>;

    /// All rows of a sheet, header included
    fn read_sheet(&mut self, name: &str) -> std::result::Result<Vec<Vec<Cell>>, String>;
}

/// calamine-backed source for .xlsx / .xls / .ods files
pub struct CalamineWorkbook {
    sheets: Sheets<BufReader<File>>,
}

impl CalamineWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::load(path, "file not found"));
        }
        let sheets = open_workbook_auto(path).map_err(|e| PipelineError::load(path, e))?;
        Ok(CalamineWorkbook { sheets })
    }
}

impl WorkbookSource for CalamineWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    fn read_sheet(&mut self, name: &str) -> std::result::Result<Vec<Vec<Cell>>, String> {
        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|e| e.to_string())?;

        Ok(range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect())
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Open a workbook file and load every sheet
pub fn load_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = CalamineWorkbook::open(path)?;
    load_from_source(&mut workbook, path)
}

/// Concatenate every sheet of `source`
///
/// `origin` is only used in error messages.
pub fn load_from_source<S: WorkbookSource>(source: &mut S, origin: &Path) -> Result<RawTable> {
    let origin: PathBuf = origin.to_path_buf();
    let mut table = RawTable::default();

    for name in source.sheet_names() {
        let rows = source
            .read_sheet(&name)
            .map_err(|e| PipelineError::load(&origin, format!("sheet '{}': {}", name, e)))?;

        let mut rows = rows.into_iter();
        let header = match rows.next() {
            Some(header) => header,
            None => {
                tracing::debug!(sheet = %name, "skipping empty sheet");
                continue;
            }
        };

        if header.len() != EXPECTED_COLUMNS {
            return Err(PipelineError::load(
                &origin,
                format!(
                    "sheet '{}' has {} columns, expected {}",
                    name,
                    header.len(),
                    EXPECTED_COLUMNS
                ),
            ));
        }

        if table.columns.is_empty() {
            table.columns = header
                .iter()
                .map(|c| c.as_text().unwrap_or_default())
                .collect();
        }

        let mut loaded = 0;
        for (idx, cells) in rows.enumerate() {
            if cells.iter().all(Cell::is_empty) {
                continue;
            }
            if cells.len() != EXPECTED_COLUMNS {
                return Err(PipelineError::load(
                    &origin,
                    format!(
                        "sheet '{}' row {} has {} columns, expected {}",
                        name,
                        idx + 2,
                        cells.len(),
                        EXPECTED_COLUMNS
                    ),
                ));
            }
            table.rows.push(RawRow {
                sheet: name.clone(),
                row_number: idx + 2,
                cells,
            });
            loaded += 1;
        }

        tracing::debug!(sheet = %name, rows = loaded, "loaded sheet");
    }

    tracing::info!(rows = table.len(), "workbook loaded");
    Ok(table)
}

// ============================================================================
// TESTS
// ============================================================================
