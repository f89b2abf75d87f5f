//! CSV ingestion into a [`RecordStore`].
//!
//! The file is memory-mapped and read by header name. Identifier fields are
//! trimmed, `Sales` accepts currency formatting (`"$5,320 "`), and dates are
//! tried against a list of formats in order.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use memchr::memchr_iter;
use memmap2::Mmap;
use tracing::{info, warn};

use crate::processor::RollupError;
use crate::processor::record::{RecordStore, SalesRecord};

pub const DATE: &str = "Date";
pub const SALES_PERSON: &str = "Sales Person";
pub const GEOGRAPHY: &str = "Geography";
pub const PRODUCT: &str = "Product";
pub const SALES: &str = "Sales";
pub const BOXES: &str = "Boxes";

pub const REQUIRED_COLUMNS: [&str; 6] = [DATE, SALES_PERSON, GEOGRAPHY, PRODUCT, SALES, BOXES];

pub const DEFAULT_DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d-%b-%y", "%d-%b-%Y", "%m/%d/%Y", "%d/%m/%Y"];

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    /// Collect malformed rows in the summary instead of failing the load
    pub skip_malformed: bool,
    /// `chrono` formats tried in order for the `Date` column
    pub date_formats: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            skip_malformed: false,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ParseSummary {
    pub rows_processed: usize,
    pub rows_loaded: usize,
    pub errors: Vec<ParseError>,
}

/// A row rejected while loading
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub error: String,
}

impl From<ParseError> for RollupError {
    fn from(e: ParseError) -> Self {
        let reason = if e.column.is_empty() {
            e.error
        } else {
            format!("{} '{}': {}", e.column, e.value, e.error)
        };
        RollupError::MalformedRecord { row: e.row, reason }
    }
}

/// Loads a CSV file into a record store.
///
/// # Errors
/// - [`RollupError::Io`] if the file cannot be opened or mapped
/// - [`RollupError::MissingColumn`] if a required header is absent
/// - [`RollupError::MalformedRecord`] for the first bad row, unless
///   `skip_malformed` is set
pub fn load_csv(
    path: &Path,
    options: &IngestOptions,
) -> Result<(RecordStore, ParseSummary), RollupError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return parse_csv(&[], options);
    }
    let mmap = unsafe { Mmap::map(&file)? };
    let (store, summary) = parse_csv(&mmap[..], options)?;

    info!(
        path = %path.display(),
        rows = summary.rows_processed,
        loaded = summary.rows_loaded,
        skipped = summary.errors.len(),
        "loaded sales records"
    );

    Ok((store, summary))
}

/// Same as [`load_csv`] over an in-memory buffer
pub fn parse_csv(
    buf: &[u8],
    options: &IngestOptions,
) -> Result<(RecordStore, ParseSummary), RollupError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(buf);
    let layout = ColumnLayout::from_headers(reader.headers()?)?;

    let estimated_rows = memchr_iter(b'\n', buf).count();
    let mut records = Vec::with_capacity(estimated_rows);
    let mut summary = ParseSummary::default();

    for (i, result) in reader.records().enumerate() {
        summary.rows_processed += 1;
        // header is line 1
        let fallback_row = i + 2;

        let parsed = match result {
            Ok(row) => {
                let line = row.position().map_or(fallback_row, |p| p.line() as usize);
                parse_row(&row, &layout, options, line)
            }
            Err(e) => Err(ParseError {
                row: fallback_row,
                column: String::new(),
                value: String::new(),
                error: e.to_string(),
            }),
        };

        match parsed {
            Ok(record) => records.push(record),
            Err(e) if options.skip_malformed => {
                warn!(row = e.row, column = %e.column, error = %e.error, "skipping malformed row");
                summary.errors.push(e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    summary.rows_loaded = records.len();
    Ok((RecordStore::new(records), summary))
}

/// Positions of the required columns within a row
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    date: usize,
    sales_person: usize,
    geography: usize,
    product: usize,
    sales: usize,
    boxes: usize,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self, RollupError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or_else(|| RollupError::MissingColumn(name.to_string()))
        };
        Ok(ColumnLayout {
            date: find(DATE)?,
            sales_person: find(SALES_PERSON)?,
            geography: find(GEOGRAPHY)?,
            product: find(PRODUCT)?,
            sales: find(SALES)?,
            boxes: find(BOXES)?,
        })
    }
}

fn parse_row(
    row: &StringRecord,
    layout: &ColumnLayout,
    options: &IngestOptions,
    line: usize,
) -> Result<SalesRecord, ParseError> {
    let field = |idx: usize, column: &str| {
        row.get(idx).ok_or_else(|| ParseError {
            row: line,
            column: column.to_string(),
            value: String::new(),
            error: "missing field".to_string(),
        })
    };
    let bad = |column: &str, value: &str, error: String| ParseError {
        row: line,
        column: column.to_string(),
        value: value.to_string(),
        error,
    };

    let raw_date = field(layout.date, DATE)?;
    let date = parse_date(raw_date, &options.date_formats)
        .ok_or_else(|| bad(DATE, raw_date, "unrecognised date".to_string()))?;

    let raw_sales = field(layout.sales, SALES)?;
    let sales = parse_amount(raw_sales).map_err(|e| bad(SALES, raw_sales, e))?;

    let raw_boxes = field(layout.boxes, BOXES)?;
    let boxes = parse_count(raw_boxes).map_err(|e| bad(BOXES, raw_boxes, e))?;

    SalesRecord::new(
        date,
        field(layout.sales_person, SALES_PERSON)?,
        field(layout.geography, GEOGRAPHY)?,
        field(layout.product, PRODUCT)?,
        sales,
        boxes,
    )
    .map_err(|e| ParseError {
        row: line,
        column: String::new(),
        value: String::new(),
        error: match e {
            RollupError::MalformedRecord { reason, .. } => reason,
            other => other.to_string(),
        },
    })
}

pub fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    let raw = raw.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parses a money amount, ignoring `$`, thousands separators and spaces
pub fn parse_amount(raw: &str) -> Result<f64, String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\t'))
        .collect();
    if cleaned.is_empty() {
        return Err("empty value".to_string());
    }
    fast_float::parse::<f64, _>(cleaned.as_bytes()).map_err(|e| e.to_string())
}

/// Parses a non-negative integer count; integral floats such as `180.0` are
/// accepted
pub fn parse_count(raw: &str) -> Result<u64, String> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, ',' | ' ' | '\t')).collect();
    if cleaned.is_empty() {
        return Err("empty value".to_string());
    }
    match atoi_simd::parse::<u64>(cleaned.as_bytes()) {
        Ok(v) => Ok(v),
        Err(int_err) => match fast_float::parse::<f64, _>(cleaned.as_bytes()) {
            Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
            _ => Err(int_err.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Sales Person,Geography,Product,Date,Sales,Boxes\n\
        Jehu Rudeforth,UK,Mint Chip Choco,04-Jan-22,\"$5,320 \",180\n\
        Van Tuxwell ,India ,85% Dark Bars,01-Aug-22,\"$7,896 \",94\n\
        Gigi Bohling,India,Peanut Butter Cubes,2022-07-07,4501,91\n";

    #[test]
    fn test_parse_business_csv() {
        let (store, summary) = parse_csv(CSV.as_bytes(), &IngestOptions::default()).unwrap();
        assert_eq!(summary.rows_processed, 3);
        assert_eq!(store.len(), 3);

        let r = &store.records()[1];
        assert_eq!(r.sales_person, "Van Tuxwell");
        assert_eq!(r.geography, "India");
        assert_eq!(r.sales_amount, 7896.0);
        assert_eq!(r.box_count, 94);
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2022, 8, 1).unwrap());
        assert_eq!(store.records()[2].date, NaiveDate::from_ymd_opt(2022, 7, 7).unwrap());
    }

    #[test]
    fn test_missing_header() {
        let csv = "Date,Sales Person,Geography,Product,Sales\n2022-01-01,A,B,C,1\n";
        let err = parse_csv(csv.as_bytes(), &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, RollupError::MissingColumn(c) if c == BOXES));
    }

    #[test]
    fn test_malformed_row_is_fatal_by_default() {
        let csv = "Date,Sales Person,Geography,Product,Sales,Boxes\n\
            2022-01-01,A,UK,P,10,1\n\
            not-a-date,A,UK,P,10,1\n";
        match parse_csv(csv.as_bytes(), &IngestOptions::default()) {
            Err(RollupError::MalformedRecord { row, reason }) => {
                assert_eq!(row, 3);
                assert!(reason.contains("Date"));
            }
            other => panic!("Expected MalformedRecord, got {:?}", other.map(|(s, _)| s.len())),
        }
    }

    #[test]
    fn test_skip_malformed_collects_errors() {
        let csv = "Date,Sales Person,Geography,Product,Sales,Boxes\n\
            2022-01-01,A,UK,P,10,1\n\
            2022-01-02,   ,UK,P,10,1\n\
            2022-01-03,B,UK,P,abc,1\n\
            2022-01-04,C,UK,P,5,2\n";
        let options = IngestOptions {
            skip_malformed: true,
            ..IngestOptions::default()
        };
        let (store, summary) = parse_csv(csv.as_bytes(), &options).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(summary.rows_processed, 4);
        assert_eq!(summary.errors.len(), 2);
        assert_eq!(summary.errors[1].column, SALES);
        assert_eq!(summary.errors[1].value, "abc");
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(parse_amount(" $1,234.50 ").unwrap(), 1234.5);
        assert!(parse_amount("$").is_err());
        assert_eq!(parse_count("1,200").unwrap(), 1200);
        assert_eq!(parse_count("180.0").unwrap(), 180);
        assert!(parse_count("-3").is_err());
        assert!(parse_count("2.5").is_err());
    }

    #[test]
    fn test_empty_input() {
        let err = parse_csv(b"", &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, RollupError::MissingColumn(_)));
    }
}
