//! Presentation side of the reports: rounded CSV/JSON/text output, Arrow
//! interop and chart series. Values are rounded to [`DISPLAY_PRECISION`]
//! here and nowhere else; undefined values become empty cells or `null`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow2::{
    array::{Array, Float64Array, Utf8Array},
    chunk::Chunk,
    datatypes::{DataType, Field, Schema},
};
use serde::Serialize;
use tracing::info;

use crate::processor::query_builder::{TOTAL_SALES, monthly_trends, sales_by_category};
use crate::processor::report::{GEOGRAPHIC_ANALYSIS, MONTHLY_TRENDS, ReportBundle};
use crate::processor::record::RecordStore;
use crate::processor::table::ResultTable;
use crate::processor::{Attribute, MetricValue, RollupError};

pub const DISPLAY_PRECISION: usize = 2;

/// Rounded display form of a metric; undefined values render empty
pub fn format_value(value: MetricValue) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", DISPLAY_PRECISION, v),
        _ => String::new(),
    }
}

fn rounded(value: MetricValue) -> MetricValue {
    let scale = 10f64.powi(DISPLAY_PRECISION as i32);
    value
        .filter(|v| v.is_finite())
        .map(|v| (v * scale).round() / scale)
}

/// File name of the `position`-th sheet (0-based) of a bundle
pub fn sheet_file_name(position: usize, name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{:02} - {}.csv", position + 1, safe)
}

/// Writes one CSV table: key column first, then the metric columns
pub fn write_table_csv<W: Write>(table: &ResultTable, out: W) -> Result<(), RollupError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push(table.key_name().to_string());
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header)?;

    for row in table.rows() {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.key.to_string());
        record.extend(row.values.iter().map(|v| format_value(*v)));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes every report of the bundle as its own CSV file, in bundle order,
/// and returns the paths written
pub fn write_csv_dir(bundle: &ReportBundle, dir: &Path) -> Result<Vec<PathBuf>, RollupError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(bundle.len());

    for (position, (name, table)) in bundle.iter().enumerate() {
        let path = dir.join(sheet_file_name(position, name));
        let file = BufWriter::new(File::create(&path)?);
        write_table_csv(table, file)?;
        written.push(path);
    }

    info!(dir = %dir.display(), sheets = written.len(), "wrote CSV reports");
    Ok(written)
}

#[derive(Debug, Serialize)]
struct SheetDocument<'a> {
    name: &'a str,
    key: &'a str,
    columns: &'a [String],
    rows: Vec<RowDocument>,
}

#[derive(Debug, Serialize)]
struct RowDocument {
    key: String,
    values: Vec<MetricValue>,
}

/// JSON document holding the sheets in bundle order
pub fn to_json(bundle: &ReportBundle) -> Result<String, RollupError> {
    let sheets: Vec<SheetDocument<'_>> = bundle
        .iter()
        .map(|(name, table)| SheetDocument {
            name,
            key: table.key_name(),
            columns: table.columns(),
            rows: table
                .rows()
                .iter()
                .map(|row| RowDocument {
                    key: row.key.to_string(),
                    values: row.values.iter().map(|v| rounded(*v)).collect(),
                })
                .collect(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&sheets)?)
}

pub fn write_json(bundle: &ReportBundle, path: &Path) -> Result<(), RollupError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json(bundle)?)?;
    info!(path = %path.display(), sheets = bundle.len(), "wrote JSON reports");
    Ok(())
}

/// Aligned plain-text rendering of the first `top` rows
pub fn render_text(table: &ResultTable, top: usize) -> String {
    let mut cells: Vec<Vec<String>> = Vec::new();
    let mut header = vec![table.key_name().to_string()];
    header.extend(table.columns().iter().cloned());
    cells.push(header);
    for row in table.rows().iter().take(top) {
        let mut line = vec![row.key.to_string()];
        line.extend(row.values.iter().map(|v| match format_value(*v) {
            s if s.is_empty() => "-".to_string(),
            s => s,
        }));
        cells.push(line);
    }

    let widths: Vec<usize> = (0..cells[0].len())
        .map(|c| cells.iter().map(|r| r[c].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for line in &cells {
        let rendered: Vec<String> = line
            .iter()
            .enumerate()
            .map(|(c, cell)| {
                if c == 0 {
                    format!("{:<width$}", cell, width = widths[c])
                } else {
                    format!("{:>width$}", cell, width = widths[c])
                }
            })
            .collect();
        out.push_str(rendered.join("  ").trim_end());
        out.push('\n');
    }
    out
}

impl ResultTable {
    /// Arrow view of the table: a Utf8 key column followed by nullable
    /// Float64 metric columns. Values are not rounded.
    pub fn to_arrow(&self) -> (Schema, Chunk<Arc<dyn Array>>) {
        let mut fields = vec![Field::new(self.key_name(), DataType::Utf8, false)];
        fields.extend(
            self.columns()
                .iter()
                .map(|c| Field::new(c, DataType::Float64, true)),
        );
        let schema = Schema::from(fields);

        let keys: Vec<String> = self.keys().map(|k| k.to_string()).collect();
        let mut arrays: Vec<Arc<dyn Array>> =
            vec![Arc::new(Utf8Array::<i32>::from_slice(&keys)) as Arc<dyn Array>];
        for idx in 0..self.columns().len() {
            let values: Vec<Option<f64>> = self.rows().iter().map(|r| r.values[idx]).collect();
            arrays.push(Arc::new(Float64Array::from(values)) as Arc<dyn Array>);
        }

        (schema, Chunk::new(arrays))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

/// Data behind one chart, in table order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub kind: ChartKind,
    pub points: Vec<(String, MetricValue)>,
}

/// (label, value) pairs of one column, first `top` rows
pub fn chart_series(
    table: &ResultTable,
    column: &str,
    top: usize,
) -> Result<Vec<(String, MetricValue)>, RollupError> {
    let idx = table.column_index(column)?;
    Ok(table
        .rows()
        .iter()
        .take(top)
        .map(|r| (r.key.to_string(), r.values[idx]))
        .collect())
}

/// The four standard charts: top 10 products, sales by geography, monthly
/// sales trend and top 10 sales people
pub fn standard_charts(
    store: &RecordStore,
    bundle: &ReportBundle,
) -> Result<Vec<ChartData>, RollupError> {
    let products = sales_by_category(store, Attribute::Product)?;
    let people = sales_by_category(store, Attribute::SalesPerson)?;

    let geo = match bundle.get(GEOGRAPHIC_ANALYSIS) {
        Some(t) => t.clone(),
        None => sales_by_category(store, Attribute::Geography)?,
    };
    let monthly = match bundle.get(MONTHLY_TRENDS) {
        Some(t) => t.clone(),
        None => monthly_trends(store)?,
    };

    Ok(vec![
        ChartData {
            title: "Top 10 Products by Sales".to_string(),
            kind: ChartKind::Bar,
            points: chart_series(&products, TOTAL_SALES, 10)?,
        },
        ChartData {
            title: "Sales by Geography".to_string(),
            kind: ChartKind::Bar,
            points: chart_series(&geo, TOTAL_SALES, geo.len())?,
        },
        ChartData {
            title: "Monthly Sales Trend".to_string(),
            kind: ChartKind::Line,
            points: chart_series(&monthly, TOTAL_SALES, monthly.len())?,
        },
        ChartData {
            title: "Top 10 Sales People by Total Sales".to_string(),
            kind: ChartKind::Bar,
            points: chart_series(&people, TOTAL_SALES, 10)?,
        },
    ])
}

pub fn write_charts_json(charts: &[ChartData], path: &Path) -> Result<(), RollupError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(charts)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::report::assemble;
    use crate::processor::table::AggregateRow;

    fn table() -> ResultTable {
        let mut t = ResultTable::new(
            "Product",
            vec!["Total Sales".into(), "Sales per Box".into()],
        )
        .unwrap();
        t.push_row(AggregateRow::new("A".into(), vec![Some(150.0), Some(10.0 / 3.0)]));
        t.push_row(AggregateRow::new("Z".into(), vec![Some(50.0), None]));
        t
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(10.0 / 3.0)), "3.33");
        assert_eq!(format_value(Some(2.0)), "2.00");
        assert_eq!(format_value(None), "");
        assert_eq!(format_value(Some(f64::NAN)), "");
    }

    #[test]
    fn test_write_table_csv() {
        let mut buf = Vec::new();
        write_table_csv(&table(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Product,Total Sales,Sales per Box\nA,150.00,3.33\nZ,50.00,\n"
        );
    }

    #[test]
    fn test_json_keeps_nulls_and_order() {
        let bundle = assemble(vec![
            ("Second".to_string(), table()),
            ("First".to_string(), table().head(1)),
        ])
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&to_json(&bundle).unwrap()).unwrap();
        assert_eq!(json[0]["name"], "Second");
        assert_eq!(json[1]["name"], "First");
        assert_eq!(json[0]["rows"][0]["values"][1], 3.33);
        assert!(json[0]["rows"][1]["values"][1].is_null());
    }

    #[test]
    fn test_to_arrow_nullable_metrics() {
        let (schema, chunk) = table().to_arrow();
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields[0].name, "Product");
        assert_eq!(chunk.len(), 2);
        let sales_per_box = chunk.arrays()[2]
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!(sales_per_box.is_valid(0));
        assert!(!sales_per_box.is_valid(1));
    }

    #[test]
    fn test_render_text_marks_undefined() {
        let text = render_text(&table(), 5);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Product"));
        assert!(lines[2].ends_with('-'));
    }

    #[test]
    fn test_chart_series() {
        let series = chart_series(&table(), "Total Sales", 1).unwrap();
        assert_eq!(series, vec![("A".to_string(), Some(150.0))]);
        assert!(chart_series(&table(), "Nope", 1).is_err());
    }

    #[test]
    fn test_sheet_file_name() {
        assert_eq!(sheet_file_name(0, "Product Analysis"), "01 - Product Analysis.csv");
        assert_eq!(sheet_file_name(9, "a/b"), "10 - a_b.csv");
    }
}
