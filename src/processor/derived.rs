use crate::processor::table::ResultTable;
use crate::processor::{MetricValue, RollupError};

/// Ratio metric appended after aggregation: `name = numerator / denominator`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedSpec {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
}

impl DerivedSpec {
    pub fn ratio(name: &str, numerator: &str, denominator: &str) -> Self {
        DerivedSpec {
            name: name.to_string(),
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
        }
    }
}

/// Division with the undefined sentinel for a zero denominator or a missing
/// operand
pub fn ratio(numerator: MetricValue, denominator: MetricValue) -> MetricValue {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// Appends each derived column in order; later specs may reference earlier
/// derived columns.
///
/// # Errors
/// [`RollupError::MissingColumn`] for an unknown operand and
/// [`RollupError::DuplicateColumn`] if the new name already exists.
pub fn derive(table: &ResultTable, specs: &[DerivedSpec]) -> Result<ResultTable, RollupError> {
    let mut out = table.clone();
    for spec in specs {
        let num = out.column_index(&spec.numerator)?;
        let den = out.column_index(&spec.denominator)?;
        let values = out
            .rows()
            .iter()
            .map(|row| ratio(row.values[num], row.values[den]))
            .collect();
        out.push_column(&spec.name, values)?;
    }
    Ok(out)
}
