// 🧹 Cleaner - raw rows → TransferRecords
//
// Steps:
// 1. Rename columns positionally to canonical names
// 2. Parse ship dates (bad values → None, counted)
// 3. Coerce categorical fields (unknown values kept as Other)
// 4. Derive total_value = quantity × acquisition_value
//
// A single bad row never aborts the batch.

use crate::categories::{
    DemilCode, DemilIc, StationType, UnitOfIssue, FIELD_DEMIL_CODE, FIELD_DEMIL_IC,
    FIELD_REGION, FIELD_STATION_TYPE, FIELD_UNIT_OF_ISSUE,
};
use crate::loader::{Cell, RawRow, RawTable};
use crate::reference::crosswalk;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical column names, in workbook order
pub const CANONICAL_COLUMNS: [&str; 11] = [
    "state",
    "agency_name",
    "nsn",
    "item_name",
    "quantity",
    "ui",
    "acquisition_value",
    "demil_code",
    "demil_ic",
    "ship_date",
    "station_type",
];

const COL_STATE: usize = 0;
const COL_AGENCY: usize = 1;
const COL_NSN: usize = 2;
const COL_ITEM: usize = 3;
const COL_QUANTITY: usize = 4;
const COL_UI: usize = 5;
const COL_VALUE: usize = 6;
const COL_DEMIL_CODE: usize = 7;
const COL_DEMIL_IC: usize = 8;
const COL_SHIP_DATE: usize = 9;
const COL_STATION_TYPE: usize = 10;

static EMPTY_CELL: Cell = Cell::Empty;

/// Text date layouts seen in the disposition files
///
/// `%y` goes before `%Y`: chrono's `%Y` also takes a two-digit year.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];
/// Text dates before this year are rejected (e.g. "01/05/123")
const MIN_TEXT_YEAR: i32 = 1900;
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

// ============================================================================
// TRANSFER RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Upper-cased 2-letter code (not guaranteed to be in the crosswalk)
    pub region_code: String,
    pub agency_name: String,
    /// National stock number
    pub nsn: String,
    pub item_name: String,
    pub quantity: Option<i64>,
    pub unit_of_issue: UnitOfIssue,
    pub acquisition_value: Option<f64>,
    pub demil_code: DemilCode,
    pub demil_ic: DemilIc,
    pub ship_date: Option<NaiveDate>,
    pub station_type: StationType,

    /// quantity × acquisition_value; None when either is missing or negative,
    /// or when the product overflows
    pub total_value: Option<f64>,

    // Provenance
    pub sheet: String,
    pub row_number: usize,
}

/// Derived line-item value
///
/// Null or negative operands give None, which downstream sums treat as zero.
pub fn compute_total(quantity: Option<i64>, unit_value: Option<f64>) -> Option<f64> {
    match (quantity, unit_value) {
        (Some(q), Some(v)) if q >= 0 && v >= 0.0 && v.is_finite() => {
            Some(q as f64 * v).filter(|total| total.is_finite())
        }
        _ => None,
    }
}

// ============================================================================
// CLEAN REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanReport {
    pub rows: usize,
    /// Ship date cell present but not a date
    pub unparsed_dates: usize,
    /// Ship date cell empty
    pub missing_dates: usize,
    pub null_totals: usize,
    /// field → value → count, for values outside the expected vocabulary
    pub unknown_categories: BTreeMap<String, BTreeMap<String, usize>>,
}

impl CleanReport {
    fn note_unknown(&mut self, field: &str, value: &str) {
        *self
            .unknown_categories
            .entry(field.to_string())
            .or_default()
            .entry(value.to_string())
            .or_insert(0) += 1;
    }

    pub fn unknown_count(&self, field: &str) -> usize {
        self.unknown_categories
            .get(field)
            .map(|values| values.values().sum())
            .unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows, {} unparsed dates, {} missing dates, {} null totals, {} unknown category values",
            self.rows,
            self.unparsed_dates,
            self.missing_dates,
            self.null_totals,
            self.unknown_categories
                .values()
                .flat_map(|values| values.values())
                .sum::<usize>()
        )
    }

    fn log(&self) {
        if self.unparsed_dates > 0 {
            tracing::warn!(rows = self.unparsed_dates, "ship dates could not be parsed");
        }
        if self.null_totals > 0 {
            tracing::warn!(rows = self.null_totals, "rows without total value, excluded from sums");
        }
        for (field, values) in &self.unknown_categories {
            tracing::warn!(field = %field, distinct = values.len(), "values outside expected vocabulary");
        }
        tracing::info!("{}", self.summary());
    }
}

// ============================================================================
// CLEANING
// ============================================================================

/// Replace the header with canonical names, by position
///
/// Idempotent. Header text is never matched.
pub fn rename_columns(table: &mut RawTable) {
    table.columns = CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();
}

/// Clean a loaded table into TransferRecords plus a report
pub fn clean(mut table: RawTable) -> (Vec<TransferRecord>, CleanReport) {
    rename_columns(&mut table);

    let mut report = CleanReport::default();
    let records: Vec<TransferRecord> = table
        .rows
        .iter()
        .map(|row| clean_row(row, &mut report))
        .collect();

    report.rows = records.len();
    report.log();
    (records, report)
}

fn clean_row(row: &RawRow, report: &mut CleanReport) -> TransferRecord {
    let cell = |idx: usize| row.cells.get(idx).unwrap_or(&EMPTY_CELL);
    let text = |idx: usize| cell(idx).as_text().unwrap_or_default();

    let region_code = text(COL_STATE).to_uppercase();
    if !crosswalk::is_known_code(&region_code) {
        report.note_unknown(FIELD_REGION, &region_code);
    }

    let unit_of_issue = UnitOfIssue::parse(&text(COL_UI));
    if !unit_of_issue.is_known() {
        report.note_unknown(FIELD_UNIT_OF_ISSUE, unit_of_issue.as_str());
    }

    let demil_code = DemilCode::parse(&text(COL_DEMIL_CODE));
    if !demil_code.is_known() {
        report.note_unknown(FIELD_DEMIL_CODE, &demil_code.as_string());
    }

    let demil_ic = DemilIc::parse(&text(COL_DEMIL_IC));
    if !demil_ic.is_known() {
        report.note_unknown(FIELD_DEMIL_IC, &demil_ic.as_string());
    }

    let station_type = StationType::parse(&text(COL_STATION_TYPE));
    if !station_type.is_known() {
        report.note_unknown(FIELD_STATION_TYPE, station_type.as_str());
    }

    let date_cell = cell(COL_SHIP_DATE);
    let ship_date = parse_date(date_cell);
    if ship_date.is_none() {
        if date_cell.is_empty() {
            report.missing_dates += 1;
        } else {
            report.unparsed_dates += 1;
        }
    }

    let quantity = parse_quantity(cell(COL_QUANTITY));
    let acquisition_value = parse_amount(cell(COL_VALUE));
    let total_value = compute_total(quantity, acquisition_value);
    if total_value.is_none() {
        report.null_totals += 1;
    }

    TransferRecord {
        region_code,
        agency_name: text(COL_AGENCY),
        nsn: text(COL_NSN),
        item_name: text(COL_ITEM),
        quantity,
        unit_of_issue,
        acquisition_value,
        demil_code,
        demil_ic,
        ship_date,
        station_type,
        total_value,
        sheet: row.sheet.clone(),
        row_number: row.row_number,
    }
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

/// Spreadsheet serial day → calendar date (1900 date system)
fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    // 1 = 1900-01-01, 2958465 = 9999-12-31
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn date_from_text(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|format| {
                NaiveDateTime::parse_from_str(raw, format)
                    .ok()
                    .map(|datetime| datetime.date())
            })
        });
    parsed.filter(|date| date.year() >= MIN_TEXT_YEAR)
}

/// Ship date from any cell shape; None when it isn't a date
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(serial) | Cell::Float(serial) => date_from_serial(*serial),
        Cell::Int(serial) => date_from_serial(*serial as f64),
        Cell::Text(s) | Cell::DateTimeIso(s) => date_from_text(s),
        Cell::Empty | Cell::Bool(_) | Cell::Error(_) => None,
    }
}

fn clean_number_text(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect()
}

/// Whole-number quantity; fractional or non-numeric values give None
pub fn parse_quantity(cell: &Cell) -> Option<i64> {
    let as_whole = |f: f64| {
        if f.is_finite() && f.fract() == 0.0 {
            Some(f as i64)
        } else {
            None
        }
    };

    match cell {
        Cell::Int(i) => Some(*i),
        Cell::Float(f) => as_whole(*f),
        Cell::Text(s) => {
            let cleaned = clean_number_text(s);
            cleaned
                .parse::<i64>()
                .ok()
                .or_else(|| cleaned.parse::<f64>().ok().and_then(as_whole))
        }
        _ => None,
    }
}

/// Money amount; "$1,234.50" style text is accepted
pub fn parse_amount(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Int(i) => Some(*i as f64),
        Cell::Float(f) => Some(*f),
        Cell::Text(s) => clean_number_text(s).parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::data_row;

    fn table(rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable {
            columns: vec!["whatever".to_string(); 11],
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, cells)| RawRow {
                    sheet: "Sheet1".to_string(),
                    row_number: i + 2,
                    cells,
                })
                .collect(),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_compute_total() {
        assert_eq!(compute_total(Some(2), Some(100.0)), Some(200.0));
        assert_eq!(compute_total(Some(0), Some(100.0)), Some(0.0));
        assert_eq!(compute_total(None, Some(100.0)), None);
        assert_eq!(compute_total(Some(2), None), None);
        assert_eq!(compute_total(Some(-1), Some(100.0)), None);
        assert_eq!(compute_total(Some(3), Some(-5.0)), None);
    }

    #[test]
    fn test_overflowing_total_is_null() {
        assert_eq!(compute_total(Some(i64::MAX), Some(1e300)), None);

        let (records, report) = clean(table(vec![data_row(
            "CA",
            i64::MAX,
            1e300,
            Cell::Empty,
        )]));
        assert_eq!(records[0].total_value, None);
        assert_eq!(report.null_totals, 1);
    }

    #[test]
    fn test_clean_single_record() {
        let (records, report) = clean(table(vec![data_row(
            "ca",
            2,
            100.0,
            Cell::Text("2023-01-05".to_string()),
        )]));

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.region_code, "CA");
        assert_eq!(record.quantity, Some(2));
        assert_eq!(record.acquisition_value, Some(100.0));
        assert_eq!(record.total_value, Some(200.0));
        assert_eq!(record.ship_date, Some(ymd(2023, 1, 5)));
        assert_eq!(record.unit_of_issue, UnitOfIssue::Each);
        assert_eq!(record.demil_code, DemilCode::Code('D'));
        assert_eq!(record.demil_ic, DemilIc::Code(1));
        assert_eq!(record.station_type, StationType::State);
        assert_eq!(record.sheet, "Sheet1");
        assert_eq!(record.row_number, 2);

        assert_eq!(report.rows, 1);
        assert_eq!(report.null_totals, 0);
        assert_eq!(report.unparsed_dates, 0);
    }

    #[test]
    fn test_rename_columns_is_positional_and_idempotent() {
        let mut raw = table(vec![]);
        rename_columns(&mut raw);
        let once = raw.columns.clone();
        rename_columns(&mut raw);

        assert_eq!(raw.columns, once);
        assert_eq!(raw.columns[0], "state");
        assert_eq!(raw.columns[9], "ship_date");
        assert_eq!(raw.columns.len(), CANONICAL_COLUMNS.len());
    }

    #[test]
    fn test_bad_date_becomes_null_without_failing() {
        let (records, report) = clean(table(vec![
            data_row("TX", 1, 50.0, Cell::Text("not a date".to_string())),
            data_row("TX", 1, 75.0, Cell::Empty),
            data_row("TX", 1, 75.0, Cell::Text("02/30/2020".to_string())),
        ]));

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.ship_date.is_none()));
        assert_eq!(report.unparsed_dates, 2);
        assert_eq!(report.missing_dates, 1);
        // totals still computed
        assert_eq!(records[0].total_value, Some(50.0));
    }

    #[test]
    fn test_parse_date_shapes() {
        // 44931 = 2023-01-05
        assert_eq!(parse_date(&Cell::DateTime(44931.0)), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date(&Cell::DateTime(44931.75)), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date(&Cell::Int(44931)), Some(ymd(2023, 1, 5)));
        assert_eq!(
            parse_date(&Cell::Text("01/05/2023".to_string())),
            Some(ymd(2023, 1, 5))
        );
        assert_eq!(
            parse_date(&Cell::Text("2023-01-05 00:00:00".to_string())),
            Some(ymd(2023, 1, 5))
        );
        assert_eq!(
            parse_date(&Cell::DateTimeIso("2023-01-05T13:45:00".to_string())),
            Some(ymd(2023, 1, 5))
        );
        assert_eq!(parse_date(&Cell::Float(-3.0)), None);
        assert_eq!(parse_date(&Cell::Bool(true)), None);
    }

    #[test]
    fn test_two_digit_year_text_dates() {
        assert_eq!(
            parse_date(&Cell::Text("01/05/23".to_string())),
            Some(ymd(2023, 1, 5))
        );
        assert_eq!(
            parse_date(&Cell::Text("12/31/99".to_string())),
            Some(ymd(1999, 12, 31))
        );
        assert_eq!(
            parse_date(&Cell::Text("01/05/2023".to_string())),
            Some(ymd(2023, 1, 5))
        );
        // Neither a 2- nor a plausible 4-digit year
        assert_eq!(parse_date(&Cell::Text("01/05/123".to_string())), None);
        assert_eq!(parse_date(&Cell::Text("0023-01-05".to_string())), None);
    }

    #[test]
    fn test_null_or_negative_operands_give_null_total() {
        let negative_qty = data_row("NY", -4, 10.0, Cell::Empty);
        let mut text_value = data_row("NY", 3, 0.0, Cell::Empty);
        text_value[6] = Cell::Text("$1,250.50".to_string());
        let mut missing_value = data_row("NY", 1, 0.0, Cell::Empty);
        missing_value[6] = Cell::Empty;

        let (records, report) = clean(table(vec![negative_qty, text_value, missing_value]));

        assert_eq!(records[0].total_value, None);
        assert_eq!(records[1].acquisition_value, Some(1250.5));
        assert_eq!(records[1].total_value, Some(3751.5));
        assert_eq!(records[2].total_value, None);
        assert_eq!(report.null_totals, 2);
    }

    #[test]
    fn test_unknown_categories_are_kept_and_counted() {
        let mut row = data_row("zz", 1, 1.0, Cell::Empty);
        row[5] = Cell::Text("Hogshead".to_string());
        row[10] = Cell::Text("Municipal".to_string());

        let (records, report) = clean(table(vec![row]));

        assert_eq!(records[0].region_code, "ZZ");
        assert_eq!(records[0].unit_of_issue, UnitOfIssue::Other("Hogshead".to_string()));
        assert_eq!(records[0].station_type.as_str(), "Municipal");
        assert_eq!(report.unknown_count(FIELD_REGION), 1);
        assert_eq!(report.unknown_count(FIELD_UNIT_OF_ISSUE), 1);
        assert_eq!(report.unknown_count(FIELD_STATION_TYPE), 1);
        assert_eq!(report.unknown_count(FIELD_DEMIL_CODE), 0);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&Cell::Int(5)), Some(5));
        assert_eq!(parse_quantity(&Cell::Float(5.0)), Some(5));
        assert_eq!(parse_quantity(&Cell::Float(5.5)), None);
        assert_eq!(parse_quantity(&Cell::Text("1,200".to_string())), Some(1200));
        assert_eq!(parse_quantity(&Cell::Text("lots".to_string())), None);
        assert_eq!(parse_quantity(&Cell::Empty), None);
    }
}
