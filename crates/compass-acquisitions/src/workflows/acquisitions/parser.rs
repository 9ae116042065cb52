//! Reads the purchased-properties spreadsheet into [`SourceRecord`]s.
//!
//! Workbooks go through calamine, CSV exports through the csv crate, and
//! literal record lists through serde_json. All three end up in the same
//! header-driven row mapping.

use calamine::{open_workbook_auto, Data, Reader};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use super::domain::{RawCell, SourceRecord};

/// Sheet read when `--sheet` is not given and the workbook has one.
pub const PREFERRED_SHEET: &str = "Acquisitions";

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not read workbook: {0}")]
    Workbook(String),
    #[error("sheet '{name}' not found (available: {available})")]
    MissingSheet { name: String, available: String },
    #[error("workbook contains no sheets")]
    NoSheets,
    #[error("invalid JSON records: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported input format '{0}' (expected xlsx, xls, xlsb, ods, csv or json)")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Title,
    Suburb,
    Region,
    PropertyType,
    Price,
    Date,
    AgentWebsite,
    AgentActual,
    Market,
    Weeks,
    Beds,
    Baths,
    Cars,
    Land,
    Link,
}

fn normalize_header(header: &str) -> String {
    header
        .replace('\u{feff}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn column_for(header: &str) -> Option<Column> {
    let column = match normalize_header(header).as_str() {
        "task name" | "title" => Column::Title,
        "suburb" => Column::Suburb,
        "region" => Column::Region,
        "property type" | "type" => Column::PropertyType,
        "purchase price (currency)" | "purchase price" | "price" => Column::Price,
        "sign on date (date)" | "sign on date" | "purchase date" | "date" => Column::Date,
        "ba purchased website" | "agent" => Column::AgentWebsite,
        "ba purchased actual" => Column::AgentActual,
        "bought on market/off-market/auction" | "market" => Column::Market,
        "engagement time (weeks)" | "engagement time" | "weeks" => Column::Weeks,
        "bedroom (short text)" | "bedroom" | "bedrooms" | "beds" => Column::Beds,
        "bathroom (short text)" | "bathroom" | "bathrooms" | "baths" => Column::Baths,
        "car" | "cars" => Column::Cars,
        "land size (short text)" | "land size" | "land" => Column::Land,
        "link" => Column::Link,
        _ => return None,
    };
    Some(column)
}

fn assign(record: &mut SourceRecord, column: Column, cell: RawCell) {
    match column {
        Column::Title => record.title = cell.text_or_empty(),
        Column::Suburb => record.suburb = cell.text_or_empty(),
        Column::Region => record.region = cell.text_or_empty(),
        Column::PropertyType => record.property_type = cell.text_or_empty(),
        Column::Price => record.purchase_price = cell,
        Column::Date => record.purchase_date = cell,
        Column::AgentWebsite => record.agent_website = cell.text_or_empty(),
        Column::AgentActual => record.agent_actual = cell.text_or_empty(),
        Column::Market => record.market = cell.text_or_empty(),
        Column::Weeks => record.engagement_weeks = cell,
        Column::Beds => record.beds = cell,
        Column::Baths => record.baths = cell,
        Column::Cars => record.cars = cell,
        Column::Land => record.land_size = cell,
        Column::Link => record.link = cell.text_or_empty(),
    }
}

/// Maps data rows onto records by header. Row numbers are 1-based spreadsheet
/// rows, so the first data row is row 2. Blank rows are dropped.
fn records_from_rows<I>(headers: &[String], rows: I) -> Vec<SourceRecord>
where
    I: IntoIterator<Item = Vec<RawCell>>,
{
    let columns: Vec<Option<Column>> = headers.iter().map(|header| column_for(header)).collect();

    rows.into_iter()
        .enumerate()
        .filter_map(|(index, cells)| {
            let mut record = SourceRecord {
                row: index + 2,
                ..SourceRecord::default()
            };
            for (column, cell) in columns.iter().zip(cells) {
                if let Some(column) = column {
                    assign(&mut record, *column, cell);
                }
            }
            (!record.is_blank()).then_some(record)
        })
        .collect()
}

fn cell_from_data(data: &Data) -> RawCell {
    match data {
        Data::Empty | Data::Error(_) => RawCell::Empty,
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                RawCell::Empty
            } else {
                RawCell::Text(trimmed.to_string())
            }
        }
        Data::Float(number) => RawCell::Number(*number),
        Data::Int(number) => RawCell::Number(*number as f64),
        Data::Bool(flag) => RawCell::Text(flag.to_string()),
        Data::DateTime(date) => RawCell::Number(date.as_f64()),
    }
}

pub struct SpreadsheetReader;

impl SpreadsheetReader {
    /// Dispatches on the file extension.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        sheet: Option<&str>,
    ) -> Result<Vec<SourceRecord>, SpreadsheetError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Self::from_workbook(path, sheet),
            "csv" => Self::from_csv_reader(open(path)?),
            "json" => Self::from_json_reader(open(path)?),
            other => Err(SpreadsheetError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_workbook(
        path: &Path,
        sheet: Option<&str>,
    ) -> Result<Vec<SourceRecord>, SpreadsheetError> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|err| SpreadsheetError::Workbook(format!("{}: {err}", path.display())))?;
        let names = workbook.sheet_names().to_vec();
        let name = select_sheet(&names, sheet)?;

        let range = workbook
            .worksheet_range(&name)
            .map_err(|err| SpreadsheetError::Workbook(format!("sheet '{name}': {err}")))?;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(Vec::new());
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell_from_data(cell).text_or_empty())
            .collect();

        Ok(records_from_rows(
            &headers,
            rows.map(|row| row.iter().map(cell_from_data).collect()),
        ))
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Vec<SourceRecord>, SpreadsheetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(RawCell::from_text).collect());
        }

        Ok(records_from_rows(&headers, rows))
    }

    /// A JSON array of literal records, e.g. an export kept alongside the
    /// sheet. Missing row numbers are filled from the array position.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Vec<SourceRecord>, SpreadsheetError> {
        let records: Vec<SourceRecord> = serde_json::from_reader(reader)?;
        Ok(records
            .into_iter()
            .enumerate()
            .map(|(index, mut record)| {
                if record.row == 0 {
                    record.row = index + 1;
                }
                record
            })
            .filter(|record| !record.is_blank())
            .collect())
    }
}

fn open(path: &Path) -> Result<File, SpreadsheetError> {
    File::open(path).map_err(|source| SpreadsheetError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn select_sheet(names: &[String], requested: Option<&str>) -> Result<String, SpreadsheetError> {
    if names.is_empty() {
        return Err(SpreadsheetError::NoSheets);
    }

    match requested {
        Some(requested) => names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(requested.trim()))
            .cloned()
            .ok_or_else(|| SpreadsheetError::MissingSheet {
                name: requested.to_string(),
                available: names.join(", "),
            }),
        None => Ok(names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(PREFERRED_SHEET))
            .unwrap_or(&names[0])
            .clone()),
    }
}
