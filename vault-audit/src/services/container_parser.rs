//! Container workbook ingestion
//!
//! Parses an uploaded workbook (a "Parameters" sheet followed by one data
//! sheet) into a [`ContainerSnapshot`]. A structurally unparseable workbook
//! fails with [`Error::Parse`] and produces no partial snapshot; an
//! unparseable created-at cell falls back to the processing date instead of
//! failing (see [`SheetParameters::created_at_date`]).

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;
use vault_common::time::DISPLAY_DATETIME_FORMAT;
use vault_common::{time, Error, Result};

use crate::models::{ContainerSnapshot, SheetParameters, Transaction};

/// Sheet holding the container metadata cells
const PARAMETERS_SHEET: &str = "Parameters";

/// Denomination and administrative rows that never count as container labels,
/// no matter how often they appear on the data sheet
const EXCLUDED_LABELS: &[&str] = &[
    "Bags",
    "Labels",
    "Non-std  : Pennies",
    "Non-std  : Dimes",
    "Non-std bags : Pennies",
    "Non-std bags : Nickels",
    "Non-std bags : Nickles",
    "Non-std bags : Dimes",
    "Non-std bags : Quarters",
    "Non-std bags : Dollars",
    "Boxes : Pennies",
    "Boxes : Nickels",
    "Boxes : Dimes",
    "Boxes : Quarters",
    "Boxes : Half dollars",
    "Boxes : Dollars",
    "Bags : Pennies",
    "Bags : Nickels",
    "Bags : Nickles",
    "Bags : Dimes",
    "Bags : Quarters",
    "Bags : Half dollars",
    "Bags : Dollars",
];

/// Reject an upload before any parsing is attempted.
///
/// No state is mutated on rejection; the previously active snapshot (if any)
/// is unaffected.
pub fn validate_upload(file_name: &str, path: &Path) -> Result<()> {
    if file_name.trim().is_empty() {
        return Err(Error::Validation("No file selected".to_string()));
    }
    if !file_name.to_ascii_lowercase().ends_with(".xlsx") {
        return Err(Error::Validation(
            "Only .xlsx files are allowed".to_string(),
        ));
    }
    if !path.exists() {
        return Err(Error::Validation("No file uploaded".to_string()));
    }
    Ok(())
}

/// Parse a container workbook into a snapshot.
///
/// The sheet at index 1 (the one after Parameters) is the data sheet and
/// its name becomes the snapshot's location name.
pub fn parse_container_workbook(path: &Path) -> Result<ContainerSnapshot> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| Error::Parse(format!("Unreadable workbook {}: {}", path.display(), e)))?;

    let parameters_range = workbook
        .worksheet_range(PARAMETERS_SHEET)
        .map_err(|e| Error::Parse(format!("Missing '{}' sheet: {}", PARAMETERS_SHEET, e)))?;
    let parameters = parse_parameters(&parameters_range);

    let sheet_names = workbook.sheet_names().to_owned();
    let location_name = sheet_names
        .get(1)
        .cloned()
        .ok_or_else(|| Error::Parse("Workbook has no data sheet after 'Parameters'".to_string()))?;

    let data_range = workbook
        .worksheet_range(&location_name)
        .map_err(|e| Error::Parse(format!("Unreadable data sheet '{}': {}", location_name, e)))?;
    let (transactions, expected_labels) = parse_data_sheet(&data_range);

    info!(
        location = %location_name,
        carrier_location = %parameters.carrier_location,
        expected_labels = expected_labels.len(),
        transactions = transactions.len(),
        "Parsed container workbook"
    );

    Ok(ContainerSnapshot {
        location_name,
        parameters,
        expected_labels,
        transactions,
    })
}

/// Read the four fixed metadata cells (column B, rows 1-4)
fn parse_parameters(sheet: &Range<Data>) -> SheetParameters {
    let today = time::today();
    let (created_at, created_at_date) = sheet
        .get_value((0, 1))
        .map(|raw| parse_created_at(raw, today))
        .unwrap_or_else(|| (String::new(), today));

    let raw_location = cell_at(sheet, 3, 1);
    // Keep the segment after the first " : " as the canonical location
    let carrier_location = match raw_location.split_once(" : ") {
        Some((_, canonical)) => canonical.to_string(),
        None => raw_location,
    };

    SheetParameters {
        created_at,
        created_at_date,
        created_by: cell_at(sheet, 1, 1),
        carrier: cell_at(sheet, 2, 1),
        carrier_location,
    }
}

/// Extract (display string, calendar date) from the created-at cell.
///
/// Attempts, in order: a native Excel datetime; `YYYY-MM-DD HH:MM AM/PM TZ`
/// (converted to 24-hour, timezone abbreviation kept in the display string);
/// a bare `YYYY-MM-DD` prefix (midnight). Anything else keeps the raw text
/// for display and falls back to `today` for the date.
fn parse_created_at(raw: &Data, today: NaiveDate) -> (String, NaiveDate) {
    match raw {
        Data::DateTime(excel_dt) => match excel_dt.as_datetime() {
            Some(dt) => (dt.format(DISPLAY_DATETIME_FORMAT).to_string(), dt.date()),
            None => (String::new(), today),
        },
        Data::String(s) => {
            let text = s.trim();
            match parse_created_at_text(text) {
                Some((display, date)) => (display, date),
                None => (text.to_string(), today),
            }
        }
        Data::Empty => (String::new(), today),
        other => (cell_text(other), today),
    }
}

fn parse_created_at_text(text: &str) -> Option<(String, NaiveDate)> {
    // "2025-10-11 09:00 AM CDT"
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() >= 4 && (tokens[2] == "AM" || tokens[2] == "PM") {
        let stamp = format!("{} {} {}", tokens[0], tokens[1], tokens[2]);
        if let Ok(dt) = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %I:%M %p") {
            let display = format!("{} {}", dt.format(DISPLAY_DATETIME_FORMAT), tokens[3]);
            return Some((display, dt.date()));
        }
    }

    // "2025-10-11 00:00:00" or bare "2025-10-11": date prefix, midnight
    let prefix = text.get(..10)?;
    let date = NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some((midnight.format(DISPLAY_DATETIME_FORMAT).to_string(), date))
}

/// Row-by-row scan of the data sheet (rows after the header row).
///
/// Primary rows (origin, destination, type all present) open a transaction,
/// closing any open one. Separator rows (origin only) close without opening.
/// Every other row contributes its label/count/value to the open transaction.
/// Labels join the expected set wherever they appear, open transaction or not.
fn parse_data_sheet(sheet: &Range<Data>) -> (Vec<Transaction>, BTreeSet<String>) {
    let mut transactions = Vec::new();
    let mut expected_labels = BTreeSet::new();
    let mut current: Option<Transaction> = None;

    for row in sheet.rows().skip(1) {
        let origin = row_text(row, 0);
        let destination = row_text(row, 1);
        let kind = row_text(row, 2);

        let is_primary = !origin.is_empty() && !destination.is_empty() && !kind.is_empty();
        let is_separator = !origin.is_empty() && destination.is_empty() && kind.is_empty();

        if is_separator {
            if let Some(finished) = current.take() {
                transactions.push(finished);
            }
            continue;
        }

        if is_primary {
            if let Some(finished) = current.take() {
                transactions.push(finished);
            }
            current = Some(Transaction {
                origin,
                destination,
                kind,
                departure_date: row_text(row, 3),
                arrival_date: row_text(row, 4),
                labels: Vec::new(),
                total_count: 0.0,
                total_value: 0.0,
            });
        }

        let label = row_text(row, 5);
        if !label.is_empty() && !EXCLUDED_LABELS.contains(&label.as_str()) {
            expected_labels.insert(label.clone());
            if let Some(open) = current.as_mut() {
                open.labels.push(label);
            }
        }

        if let Some(open) = current.as_mut() {
            open.total_count += row_number(row, 6);
            open.total_value += row_number(row, 7);
        }
    }

    if let Some(finished) = current.take() {
        transactions.push(finished);
    }

    (transactions, expected_labels)
}

fn cell_at(sheet: &Range<Data>, row: u32, col: u32) -> String {
    sheet
        .get_value((row, col))
        .map(cell_text)
        .unwrap_or_default()
}

fn row_text(row: &[Data], col: usize) -> String {
    row.get(col).map(cell_text).unwrap_or_default()
}

fn row_number(row: &[Data], col: usize) -> f64 {
    match row.get(col) {
        Some(Data::Float(f)) => *f,
        Some(Data::Int(i)) => *i as f64,
        Some(Data::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Render a cell the way it reads on the sheet
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format(DISPLAY_DATETIME_FORMAT).to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Empty | Data::Error(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn range_from(rows: Vec<Vec<Data>>) -> Range<Data> {
        let max_cols = rows.iter().map(|r| r.len()).max().unwrap_or(1).max(1);
        let mut range = Range::new((0, 0), (rows.len().max(1) as u32 - 1, max_cols as u32 - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), value);
            }
        }
        range
    }

    fn parameters_range(created_at: Data, location: &str) -> Range<Data> {
        range_from(vec![
            vec![s("Created At"), created_at],
            vec![s("Created By"), s("auditor@example.com")],
            vec![s("Carrier"), s("Acme Armored")],
            vec![s("Carrier Location"), s(location)],
        ])
    }

    #[test]
    fn test_parameters_location_split_on_separator() {
        let range = parameters_range(s("2025-10-11"), "Acme Armored : Central Vault");
        let params = parse_parameters(&range);
        assert_eq!(params.carrier_location, "Central Vault");
        assert_eq!(params.carrier, "Acme Armored");
        assert_eq!(params.created_by, "auditor@example.com");
    }

    #[test]
    fn test_parameters_location_without_separator_kept_whole() {
        let range = parameters_range(s("2025-10-11"), "Central Vault");
        let params = parse_parameters(&range);
        assert_eq!(params.carrier_location, "Central Vault");
    }

    #[test]
    fn test_created_at_am_pm_with_timezone() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        let (display, date) = parse_created_at(&s("2025-10-11 09:00 AM CDT"), today);
        assert_eq!(display, "10/11/25 09:00:00 CDT");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 10, 11).unwrap());
    }

    #[test]
    fn test_created_at_pm_converts_to_24_hour() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        let (display, date) = parse_created_at(&s("2025-10-11 02:30 PM CST"), today);
        assert_eq!(display, "10/11/25 14:30:00 CST");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 10, 11).unwrap());
    }

    #[test]
    fn test_created_at_bare_date_prefix() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        let (display, date) = parse_created_at(&s("2025-10-11 00:00:00"), today);
        assert_eq!(display, "10/11/25 00:00:00");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 10, 11).unwrap());
    }

    #[test]
    fn test_created_at_unparseable_falls_back_to_today() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        let (display, date) = parse_created_at(&s("sometime last week"), today);
        // Raw text kept for display, date anchored to processing day
        assert_eq!(display, "sometime last week");
        assert_eq!(date, today);
    }

    #[test]
    fn test_created_at_empty_cell_falls_back_to_today() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        let (display, date) = parse_created_at(&Data::Empty, today);
        assert_eq!(display, "");
        assert_eq!(date, today);
    }

    fn header() -> Vec<Data> {
        vec![
            s("Origin"),
            s("Destination"),
            s("Type"),
            s("Departure"),
            s("Arrival"),
            s("Label"),
            s("Count"),
            s("Value"),
        ]
    }

    fn label_row(label: &str, count: f64, value: f64) -> Vec<Data> {
        vec![
            Data::Empty,
            Data::Empty,
            Data::Empty,
            Data::Empty,
            Data::Empty,
            s(label),
            Data::Float(count),
            Data::Float(value),
        ]
    }

    fn primary_row(origin: &str, label: &str) -> Vec<Data> {
        vec![
            s(origin),
            s("Central Vault"),
            s("Delivery"),
            s("2025-10-10"),
            s("2025-10-11"),
            s(label),
            Data::Float(1.0),
            Data::Float(100.0),
        ]
    }

    fn separator_row() -> Vec<Data> {
        vec![s("2025-10-12"), Data::Empty, Data::Empty]
    }

    #[test]
    fn test_transaction_grouping_with_separator() {
        let range = range_from(vec![
            header(),
            primary_row("Branch 12", "L-100"),
            label_row("L-101", 2.0, 50.0),
            label_row("L-102", 3.0, 75.0),
            separator_row(),
            primary_row("Branch 99", ""),
        ]);

        let (transactions, labels) = parse_data_sheet(&range);

        assert_eq!(transactions.len(), 2);
        assert_eq!(
            transactions[0].labels,
            vec!["L-100".to_string(), "L-101".to_string(), "L-102".to_string()]
        );
        assert_eq!(transactions[0].total_count, 6.0);
        assert_eq!(transactions[0].total_value, 225.0);
        assert_eq!(transactions[0].origin, "Branch 12");
        assert_eq!(transactions[0].kind, "Delivery");

        // Separator closed the first; the later primary row starts fresh
        assert!(transactions[1].labels.is_empty());
        assert_eq!(transactions[1].origin, "Branch 99");

        let expected: BTreeSet<String> =
            ["L-100", "L-101", "L-102"].iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn test_primary_row_closes_open_transaction() {
        let range = range_from(vec![
            header(),
            primary_row("Branch 1", "A-1"),
            label_row("A-2", 1.0, 10.0),
            primary_row("Branch 2", "B-1"),
            label_row("B-2", 1.0, 10.0),
        ]);

        let (transactions, _) = parse_data_sheet(&range);

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].labels, vec!["A-1", "A-2"]);
        assert_eq!(transactions[1].labels, vec!["B-1", "B-2"]);
    }

    #[test]
    fn test_denylisted_labels_never_join_expected_set() {
        let range = range_from(vec![
            header(),
            primary_row("Branch 1", "L-200"),
            label_row("Bags : Pennies", 4.0, 200.0),
            label_row("Bags", 1.0, 0.0),
        ]);

        let (transactions, labels) = parse_data_sheet(&range);

        assert!(!labels.contains("Bags : Pennies"));
        assert!(!labels.contains("Bags"));
        assert!(labels.contains("L-200"));
        // Denylisted rows still contribute to the transaction totals
        assert_eq!(transactions[0].total_count, 6.0);
        assert_eq!(transactions[0].labels, vec!["L-200"]);
    }

    #[test]
    fn test_label_outside_any_transaction_still_expected() {
        let range = range_from(vec![
            header(),
            primary_row("Branch 1", "L-1"),
            separator_row(),
            label_row("L-orphan", 1.0, 5.0),
        ]);

        let (transactions, labels) = parse_data_sheet(&range);

        assert_eq!(transactions.len(), 1);
        assert!(labels.contains("L-orphan"));
        assert!(!transactions[0].labels.contains(&"L-orphan".to_string()));
    }

    #[test]
    fn test_duplicate_labels_deduplicated() {
        let range = range_from(vec![
            header(),
            primary_row("Branch 1", "L-1"),
            label_row("L-1", 1.0, 5.0),
            label_row("L-1", 1.0, 5.0),
        ]);

        let (transactions, labels) = parse_data_sheet(&range);

        assert_eq!(labels.len(), 1);
        // Transaction keeps the ordered appearances
        assert_eq!(transactions[0].labels, vec!["L-1", "L-1", "L-1"]);
    }

    #[test]
    fn test_non_numeric_count_cells_contribute_zero() {
        let range = range_from(vec![
            header(),
            primary_row("Branch 1", "L-1"),
            vec![
                Data::Empty,
                Data::Empty,
                Data::Empty,
                Data::Empty,
                Data::Empty,
                s("L-2"),
                s("n/a"),
                s("12.5"),
            ],
        ]);

        let (transactions, _) = parse_data_sheet(&range);

        assert_eq!(transactions[0].total_count, 1.0);
        assert_eq!(transactions[0].total_value, 112.5);
    }

    #[test]
    fn test_validate_upload_rejects_bad_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("container.xlsx");
        std::fs::write(&present, b"stub").unwrap();

        assert!(matches!(
            validate_upload("", &present),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_upload("container.xls", &present),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_upload("container.xlsx", &dir.path().join("absent.xlsx")),
            Err(Error::Validation(_))
        ));
        assert!(validate_upload("container.xlsx", &present).is_ok());
    }

    #[test]
    fn test_unparseable_workbook_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("container.xlsx");
        std::fs::write(&bogus, b"not a zip archive").unwrap();

        assert!(matches!(
            parse_container_workbook(&bogus),
            Err(Error::Parse(_))
        ));
    }
}
