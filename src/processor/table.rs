use crate::processor::grouper::GroupKey;
use crate::processor::{MetricValue, RollupError};

/// One group's computed metrics, aligned with the owning table's columns
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub values: Vec<MetricValue>,
}

impl AggregateRow {
    pub fn new(key: GroupKey, values: Vec<MetricValue>) -> Self {
        AggregateRow { key, values }
    }
}

/// Ordered rollup result: one row per group, columns in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    key_name: String,
    columns: Vec<String>,
    rows: Vec<AggregateRow>,
}

impl ResultTable {
    /// Creates an empty table.
    ///
    /// # Errors
    /// [`RollupError::DuplicateColumn`] if a column name repeats.
    pub fn new(key_name: &str, columns: Vec<String>) -> Result<Self, RollupError> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(RollupError::DuplicateColumn(name.clone()));
            }
        }
        Ok(ResultTable {
            key_name: key_name.to_string(),
            columns,
            rows: Vec::new(),
        })
    }

    /// Appends a row. Panics if the row width does not match the columns,
    /// which only happens on an internal bug.
    pub(crate) fn push_row(&mut self, row: AggregateRow) {
        assert_eq!(row.values.len(), self.columns.len(), "row width mismatch");
        self.rows.push(row);
    }

    /// Appends a column; `values` is in row order
    pub(crate) fn push_column(
        &mut self,
        name: &str,
        values: Vec<MetricValue>,
    ) -> Result<(), RollupError> {
        if self.columns.iter().any(|c| c == name) {
            return Err(RollupError::DuplicateColumn(name.to_string()));
        }
        assert_eq!(values.len(), self.rows.len(), "column height mismatch");
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.values.push(value);
        }
        Ok(())
    }

    pub(crate) fn with_rows(&self, rows: Vec<AggregateRow>) -> ResultTable {
        ResultTable {
            key_name: self.key_name.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, RollupError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| RollupError::MissingColumn(name.to_string()))
    }

    /// Values of one column in row order
    pub fn column(&self, name: &str) -> Result<Vec<MetricValue>, RollupError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    pub fn row(&self, key: &GroupKey) -> Option<&AggregateRow> {
        self.rows.iter().find(|r| &r.key == key)
    }

    /// Single cell lookup by group label and column name
    pub fn value(&self, key: &str, column: &str) -> Result<MetricValue, RollupError> {
        let idx = self.column_index(column)?;
        Ok(self
            .rows
            .iter()
            .find(|r| r.key.to_string() == key)
            .and_then(|r| r.values[idx]))
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> + '_ {
        self.rows.iter().map(|r| &r.key)
    }

    /// First `n` rows, keeping column layout
    pub fn head(&self, n: usize) -> ResultTable {
        self.with_rows(self.rows.iter().take(n).cloned().collect())
    }
}
