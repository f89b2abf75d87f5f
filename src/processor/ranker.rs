use std::cmp::Ordering;

use crate::processor::table::ResultTable;
use crate::processor::{Direction, MetricValue, RollupError};

/// Orders rows by `column`.
///
/// The sort is stable, so equal values keep their input order. Undefined
/// values (and NaN) always go last, whatever the direction.
///
/// # Errors
/// [`RollupError::MissingColumn`] if `column` is not in the table.
pub fn rank(
    table: &ResultTable,
    column: &str,
    direction: Direction,
) -> Result<ResultTable, RollupError> {
    let idx = table.column_index(column)?;
    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| compare(a.values[idx], b.values[idx], direction));
    Ok(table.with_rows(rows))
}

/// Orders rows by group key ascending; months come out chronologically
pub fn order_by_key(table: &ResultTable) -> ResultTable {
    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    table.with_rows(rows)
}

fn compare(a: MetricValue, b: MetricValue, direction: Direction) -> Ordering {
    match (defined(a), defined(b)) {
        (Some(x), Some(y)) => {
            let ord = x.total_cmp(&y);
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn defined(v: MetricValue) -> Option<f64> {
    v.filter(|x| !x.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::grouper::GroupKey;
    use crate::processor::record::YearMonth;
    use crate::processor::table::AggregateRow;

    fn table(values: &[(&str, MetricValue)]) -> ResultTable {
        let mut t = ResultTable::new("Product", vec!["Total Sales".into()]).unwrap();
        for (k, v) in values {
            t.push_row(AggregateRow::new((*k).into(), vec![*v]));
        }
        t
    }

    fn keys(t: &ResultTable) -> Vec<String> {
        t.keys().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_descending_with_stable_ties() {
        let t = table(&[
            ("A", Some(150.0)),
            ("B", Some(200.0)),
            ("C", Some(150.0)),
            ("D", Some(10.0)),
        ]);
        let ranked = rank(&t, "Total Sales", Direction::Descending).unwrap();
        assert_eq!(keys(&ranked), vec!["B", "A", "C", "D"]);
    }

    #[test]
    fn test_nulls_last_both_directions() {
        let t = table(&[
            ("N1", None),
            ("A", Some(1.0)),
            ("NaN", Some(f64::NAN)),
            ("B", Some(2.0)),
            ("N2", None),
        ]);
        let desc = rank(&t, "Total Sales", Direction::Descending).unwrap();
        assert_eq!(keys(&desc), vec!["B", "A", "N1", "NaN", "N2"]);
        let asc = rank(&t, "Total Sales", Direction::Ascending).unwrap();
        assert_eq!(keys(&asc), vec!["A", "B", "N1", "NaN", "N2"]);
    }

    #[test]
    fn test_missing_column() {
        let t = table(&[("A", Some(1.0))]);
        assert!(matches!(
            rank(&t, "Nope", Direction::Descending),
            Err(RollupError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_order_by_month_key() {
        let mut t = ResultTable::new("Month", vec!["Total Sales".into()]).unwrap();
        for (y, m) in [(2022, 3), (2021, 12), (2022, 1)] {
            let key = GroupKey::Month(YearMonth { year: y, month: m });
            t.push_row(AggregateRow::new(key, vec![Some(1.0)]));
        }
        assert_eq!(keys(&order_by_key(&t)), vec!["2021-12", "2022-01", "2022-03"]);
    }
}
