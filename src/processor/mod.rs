use std::fmt;

use thiserror::Error;

pub mod aggregator;
pub mod derived;
pub mod grouper;
pub mod query_builder;
pub mod ranker;
pub mod record;
pub mod report;
pub mod table;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum RollupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A record violates the record store invariants. `row` is the 1-based
    /// line number in the source when known, 0 otherwise.
    #[error("Malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Dimension '{dimension}' produced no key for record {row}")]
    InvalidDimension { dimension: String, row: usize },

    #[error("Duplicate report name: {0}")]
    DuplicateReportName(String),
}

/// Value of one metric cell. `None` is the undefined sentinel produced by a
/// zero denominator or a standard deviation over fewer than two records.
pub type MetricValue = Option<f64>;

/// Identifier columns of a sales record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    SalesPerson,
    Geography,
    Product,
}

impl Attribute {
    /// Header name used by the source file and by result tables
    pub fn column_name(self) -> &'static str {
        match self {
            Attribute::SalesPerson => "Sales Person",
            Attribute::Geography => "Geography",
            Attribute::Product => "Product",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Numeric columns of a sales record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    /// Sales amount
    Sales,
    /// Box count
    Boxes,
}

impl Measure {
    pub fn column_name(self) -> &'static str {
        match self {
            Measure::Sales => "Sales",
            Measure::Boxes => "Boxes",
        }
    }
}

/// Per-group statistics over a numeric column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    /// Sum of all values
    Sum,
    /// Sum divided by the number of records in the group
    Mean,
    /// Number of records in the group, whatever the measure
    Count,
    /// Sample standard deviation, undefined below two records
    StdDev,
}

/// Sort direction for the ranker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Descending,
    Ascending,
}
