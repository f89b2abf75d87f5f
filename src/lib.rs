//! # sales_rollup
//!
//! `sales_rollup` turns a flat file of sales transactions into grouped
//! business reports. It supports:
//!
//! - Memory-mapped CSV loading with tolerant number and date parsing
//! - Group-by on any identifier column, calendar month, or a custom key
//! - Sum, mean, count, sample standard deviation and distinct counts
//! - Ratio metrics that stay undefined instead of dividing by zero
//! - Stable ranking with undefined values last
//! - Parallel computation of the standard analyses with Rayon
//! - CSV, JSON and Arrow export of named report bundles
//!
//! # Example
//!
//! ```rust,no_run
//! use sales_rollup::ingest::{IngestOptions, load_csv};
//! use sales_rollup::processor::query_builder::standard_reports;
//! use sales_rollup::export::write_csv_dir;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (store, _summary) = load_csv(Path::new("sales.csv"), &IngestOptions::default())?;
//!
//!     // Product, geography, sales team and monthly analyses
//!     let bundle = standard_reports(&store)?;
//!
//!     // One CSV per report
//!     write_csv_dir(&bundle, Path::new("reports"))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod export;
pub mod ingest;
pub mod processor;
