use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::processor::{Attribute, Measure, RollupError};

/// One sales transaction
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub sales_person: String,
    pub geography: String,
    pub product: String,
    pub sales_amount: f64,
    pub box_count: u64,
}

impl SalesRecord {
    /// Builds a record, trimming identifier fields.
    ///
    /// # Errors
    /// Returns [`RollupError::MalformedRecord`] (with `row` 0) if an identifier
    /// is blank after trimming or the sales amount is negative or not finite.
    pub fn new(
        date: NaiveDate,
        sales_person: &str,
        geography: &str,
        product: &str,
        sales_amount: f64,
        box_count: u64,
    ) -> Result<Self, RollupError> {
        let sales_person = non_blank(sales_person, Attribute::SalesPerson)?;
        let geography = non_blank(geography, Attribute::Geography)?;
        let product = non_blank(product, Attribute::Product)?;

        if !sales_amount.is_finite() || sales_amount < 0.0 {
            return Err(RollupError::MalformedRecord {
                row: 0,
                reason: format!("Sales must be a non-negative number, got {}", sales_amount),
            });
        }

        Ok(SalesRecord {
            date,
            sales_person,
            geography,
            product,
            sales_amount,
            box_count,
        })
    }

    pub fn attribute(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::SalesPerson => &self.sales_person,
            Attribute::Geography => &self.geography,
            Attribute::Product => &self.product,
        }
    }

    pub fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Sales => self.sales_amount,
            Measure::Boxes => self.box_count as f64,
        }
    }

    pub fn month(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }
}

fn non_blank(value: &str, attribute: Attribute) -> Result<String, RollupError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RollupError::MalformedRecord {
            row: 0,
            reason: format!("'{}' is blank", attribute),
        });
    }
    Ok(trimmed.to_string())
}

/// Calendar month bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Immutable in-memory snapshot of all records for one analysis run.
///
/// Cloning shares the same records; there is no way to mutate them once the
/// store is built, so every analysis can read it concurrently.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Arc<[SalesRecord]>,
}

impl RecordStore {
    pub fn new(records: Vec<SalesRecord>) -> Self {
        RecordStore {
            records: records.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn get(&self, idx: usize) -> Option<&SalesRecord> {
        self.records.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SalesRecord> + '_ {
        self.records.iter()
    }

    pub fn total_sales(&self) -> f64 {
        self.records.iter().map(|r| r.sales_amount).sum()
    }

    pub fn total_boxes(&self) -> u64 {
        self.records.iter().map(|r| r.box_count).sum()
    }
}

impl From<Vec<SalesRecord>> for RecordStore {
    fn from(records: Vec<SalesRecord>) -> Self {
        RecordStore::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_trims_identifiers() {
        let r = SalesRecord::new(date(2022, 1, 4), "  Ram Mahesh ", "India ", " 70% Dark Bites", 5320.0, 180)
            .unwrap();
        assert_eq!(r.sales_person, "Ram Mahesh");
        assert_eq!(r.geography, "India");
        assert_eq!(r.product, "70% Dark Bites");
    }

    #[test]
    fn test_new_rejects_blank_identifier() {
        let err = SalesRecord::new(date(2022, 1, 4), "Ram", "   ", "Bites", 1.0, 1).unwrap_err();
        assert!(matches!(err, RollupError::MalformedRecord { .. }));
    }

    #[test]
    fn test_new_rejects_negative_sales() {
        let err = SalesRecord::new(date(2022, 1, 4), "Ram", "UK", "Bites", -1.0, 1).unwrap_err();
        assert!(matches!(err, RollupError::MalformedRecord { .. }));
    }

    #[test]
    fn test_year_month_display_and_order() {
        let jan = YearMonth::from_date(date(2022, 1, 31));
        let dec = YearMonth::from_date(date(2021, 12, 1));
        assert_eq!(jan.to_string(), "2022-01");
        assert!(dec < jan);
    }

    #[test]
    fn test_store_totals() {
        let store = RecordStore::new(vec![
            SalesRecord::new(date(2022, 1, 1), "A", "UK", "P", 10.5, 2).unwrap(),
            SalesRecord::new(date(2022, 1, 2), "B", "UK", "P", 4.5, 3).unwrap(),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_sales(), 15.0);
        assert_eq!(store.total_boxes(), 5);

        let shared = store.clone();
        assert!(std::ptr::eq(shared.records(), store.records()));
    }
}
