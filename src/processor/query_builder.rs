use tracing::{debug, info};

use crate::processor::aggregator::{MetricSpec, aggregate};
use crate::processor::derived::{DerivedSpec, derive};
use crate::processor::grouper::{ByAttribute, ByMonth, Dimension, Overall, group};
use crate::processor::ranker::{order_by_key, rank};
use crate::processor::record::RecordStore;
use crate::processor::report::{
    GEOGRAPHIC_ANALYSIS, MONTHLY_TRENDS, PRODUCT_ANALYSIS, ReportBundle, SALES_TEAM_ANALYSIS,
    assemble,
};
use crate::processor::table::ResultTable;
use crate::processor::{Attribute, Direction, Measure, RollupError, Statistic};

pub const TOTAL_SALES: &str = "Total Sales";
pub const AVERAGE_SALE: &str = "Average Sale";
pub const TRANSACTION_COUNT: &str = "Transaction Count";
pub const SALES_STD_DEV: &str = "Sales Std Dev";
pub const TOTAL_BOXES: &str = "Total Boxes";
pub const SALES_PER_BOX: &str = "Sales per Box";
pub const SALES_PER_TRANSACTION: &str = "Sales per Transaction";
pub const NUMBER_OF_SALES_PEOPLE: &str = "Number of Sales People";
pub const ACTIVE_SALES_PEOPLE: &str = "Active Sales People";

#[derive(Debug, Clone, PartialEq)]
enum Order {
    /// Keep grouping order (first appearance)
    Grouped,
    Column(String, Direction),
    Key,
}

/// Rollup pipeline: group, aggregate, derive, then order.
///
/// # Examples
///
/// ```rust
/// # use sales_rollup::processor::record::RecordStore;
/// # use sales_rollup::processor::grouper::ByAttribute;
/// # use sales_rollup::processor::{Attribute, Direction, Measure, Statistic};
/// let store = RecordStore::default();
/// let table = store
///     .query()
///     .group_by(ByAttribute(Attribute::Product))
///     .aggregate_as(Measure::Sales, Statistic::Sum, "Total Sales")
///     .aggregate_as(Measure::Boxes, Statistic::Sum, "Total Boxes")
///     .derive("Sales per Box", "Total Sales", "Total Boxes")
///     .rank_by("Total Sales", Direction::Descending)
///     .execute()
///     .unwrap();
/// assert!(table.is_empty());
/// ```
pub struct RollupQuery {
    store: RecordStore,
    dimension: Box<dyn Dimension>,
    metrics: Vec<MetricSpec>,
    derived: Vec<DerivedSpec>,
    order: Order,
    limit: Option<usize>,
}

impl RollupQuery {
    /// Query over the whole store as a single group until `group_by` is called
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            dimension: Box::new(Overall),
            metrics: Vec::new(),
            derived: Vec::new(),
            order: Order::Grouped,
            limit: None,
        }
    }

    pub fn group_by<D: Dimension + 'static>(mut self, dimension: D) -> Self {
        self.dimension = Box::new(dimension);
        self
    }

    /// Add a statistic over a numeric column under the given column name
    pub fn aggregate_as(mut self, measure: Measure, statistic: Statistic, alias: &str) -> Self {
        self.metrics.push(MetricSpec::stat(measure, statistic, alias));
        self
    }

    /// Add a distinct-value count of an identifier column
    pub fn distinct_as(mut self, attribute: Attribute, alias: &str) -> Self {
        self.metrics.push(MetricSpec::distinct(attribute, alias));
        self
    }

    pub fn metrics(mut self, specs: Vec<MetricSpec>) -> Self {
        self.metrics.extend(specs);
        self
    }

    /// Append `name = numerator / denominator` after aggregation
    pub fn derive(mut self, name: &str, numerator: &str, denominator: &str) -> Self {
        self.derived.push(DerivedSpec::ratio(name, numerator, denominator));
        self
    }

    pub fn rank_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Order::Column(column.to_string(), direction);
        self
    }

    /// Order by group key ascending instead of by a metric
    pub fn order_by_key(mut self) -> Self {
        self.order = Order::Key;
        self
    }

    /// Keep only the first `n` rows after ordering
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn execute(self) -> Result<ResultTable, RollupError> {
        let groups = group(&self.store, self.dimension.as_ref())?;
        let table = aggregate(&groups, &self.metrics)?;

        let table = if self.derived.is_empty() {
            table
        } else {
            derive(&table, &self.derived)?
        };

        let table = match &self.order {
            Order::Grouped => table,
            Order::Column(column, direction) => rank(&table, column, *direction)?,
            Order::Key => order_by_key(&table),
        };

        let table = match self.limit {
            Some(n) => table.head(n),
            None => table,
        };

        debug!(
            dimension = self.dimension.name(),
            rows = table.len(),
            columns = table.columns().len(),
            "executed rollup"
        );

        Ok(table)
    }
}

impl RecordStore {
    pub fn query(&self) -> RollupQuery {
        RollupQuery::new(self.clone())
    }
}

/// Total, mean and count of sales plus total boxes for any identifier
/// column, ranked by total sales
pub fn sales_by_category(
    store: &RecordStore,
    attribute: Attribute,
) -> Result<ResultTable, RollupError> {
    store
        .query()
        .group_by(ByAttribute(attribute))
        .aggregate_as(Measure::Sales, Statistic::Sum, TOTAL_SALES)
        .aggregate_as(Measure::Sales, Statistic::Mean, AVERAGE_SALE)
        .aggregate_as(Measure::Sales, Statistic::Count, TRANSACTION_COUNT)
        .aggregate_as(Measure::Boxes, Statistic::Sum, TOTAL_BOXES)
        .rank_by(TOTAL_SALES, Direction::Descending)
        .execute()
}

pub fn product_performance(store: &RecordStore) -> Result<ResultTable, RollupError> {
    store
        .query()
        .group_by(ByAttribute(Attribute::Product))
        .aggregate_as(Measure::Sales, Statistic::Sum, TOTAL_SALES)
        .aggregate_as(Measure::Sales, Statistic::Mean, AVERAGE_SALE)
        .aggregate_as(Measure::Sales, Statistic::StdDev, SALES_STD_DEV)
        .aggregate_as(Measure::Boxes, Statistic::Sum, TOTAL_BOXES)
        .derive(SALES_PER_BOX, TOTAL_SALES, TOTAL_BOXES)
        .rank_by(TOTAL_SALES, Direction::Descending)
        .execute()
}

pub fn geographic_performance(store: &RecordStore) -> Result<ResultTable, RollupError> {
    store
        .query()
        .group_by(ByAttribute(Attribute::Geography))
        .aggregate_as(Measure::Sales, Statistic::Sum, TOTAL_SALES)
        .aggregate_as(Measure::Sales, Statistic::Mean, AVERAGE_SALE)
        .aggregate_as(Measure::Sales, Statistic::Count, TRANSACTION_COUNT)
        .aggregate_as(Measure::Boxes, Statistic::Sum, TOTAL_BOXES)
        .distinct_as(Attribute::SalesPerson, NUMBER_OF_SALES_PEOPLE)
        .rank_by(TOTAL_SALES, Direction::Descending)
        .execute()
}

pub fn sales_team_performance(store: &RecordStore) -> Result<ResultTable, RollupError> {
    store
        .query()
        .group_by(ByAttribute(Attribute::SalesPerson))
        .aggregate_as(Measure::Sales, Statistic::Sum, TOTAL_SALES)
        .aggregate_as(Measure::Sales, Statistic::Mean, AVERAGE_SALE)
        .aggregate_as(Measure::Sales, Statistic::Count, TRANSACTION_COUNT)
        .aggregate_as(Measure::Sales, Statistic::StdDev, SALES_STD_DEV)
        .aggregate_as(Measure::Boxes, Statistic::Sum, TOTAL_BOXES)
        .derive(SALES_PER_TRANSACTION, TOTAL_SALES, TRANSACTION_COUNT)
        .rank_by(TOTAL_SALES, Direction::Descending)
        .execute()
}

/// Per calendar month totals and active sales people, in month order
pub fn monthly_trends(store: &RecordStore) -> Result<ResultTable, RollupError> {
    store
        .query()
        .group_by(ByMonth)
        .aggregate_as(Measure::Sales, Statistic::Sum, TOTAL_SALES)
        .aggregate_as(Measure::Boxes, Statistic::Sum, TOTAL_BOXES)
        .distinct_as(Attribute::SalesPerson, ACTIVE_SALES_PEOPLE)
        .order_by_key()
        .execute()
}

/// The four exported reports, in sheet order
pub fn standard_reports(store: &RecordStore) -> Result<ReportBundle, RollupError> {
    let bundle = assemble(vec![
        (PRODUCT_ANALYSIS.to_string(), product_performance(store)?),
        (GEOGRAPHIC_ANALYSIS.to_string(), geographic_performance(store)?),
        (SALES_TEAM_ANALYSIS.to_string(), sales_team_performance(store)?),
        (MONTHLY_TRENDS.to_string(), monthly_trends(store)?),
    ])?;
    info!(records = store.len(), reports = bundle.len(), "built standard reports");
    Ok(bundle)
}

/// Same as [`standard_reports`], with each analysis on the rayon pool.
///
/// Every worker reads the same immutable snapshot and builds its own table.
pub fn standard_reports_parallel(store: &RecordStore) -> Result<ReportBundle, RollupError> {
    let ((product, geo), (team, monthly)) = rayon::join(
        || {
            rayon::join(
                || product_performance(store),
                || geographic_performance(store),
            )
        },
        || {
            rayon::join(
                || sales_team_performance(store),
                || monthly_trends(store),
            )
        },
    );

    let bundle = assemble(vec![
        (PRODUCT_ANALYSIS.to_string(), product?),
        (GEOGRAPHIC_ANALYSIS.to_string(), geo?),
        (SALES_TEAM_ANALYSIS.to_string(), team?),
        (MONTHLY_TRENDS.to_string(), monthly?),
    ])?;
    info!(
        records = store.len(),
        reports = bundle.len(),
        threads = rayon::current_num_threads(),
        "built standard reports in parallel"
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::record::SalesRecord;
    use chrono::NaiveDate;

    fn record(ymd: (i32, u32, u32), person: &str, geo: &str, product: &str, sales: f64, boxes: u64) -> SalesRecord {
        let date = NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap();
        SalesRecord::new(date, person, geo, product, sales, boxes).unwrap()
    }

    fn store() -> RecordStore {
        RecordStore::new(vec![
            record((2022, 2, 3), "Ann", "UK", "A", 100.0, 10),
            record((2022, 1, 8), "Bob", "India", "A", 50.0, 5),
            record((2022, 1, 9), "Ann", "UK", "B", 200.0, 20),
            record((2022, 3, 1), "Cid", "USA", "C", 50.0, 0),
        ])
    }

    fn keys(t: &ResultTable) -> Vec<String> {
        t.keys().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_product_performance() {
        let t = product_performance(&store()).unwrap();
        assert_eq!(
            t.columns(),
            [TOTAL_SALES, AVERAGE_SALE, SALES_STD_DEV, TOTAL_BOXES, SALES_PER_BOX]
        );
        assert_eq!(keys(&t), vec!["B", "A", "C"]);
        assert_eq!(t.value("A", SALES_PER_BOX).unwrap(), Some(10.0));
        assert_eq!(t.value("B", SALES_STD_DEV).unwrap(), None);
        assert_eq!(t.value("C", SALES_PER_BOX).unwrap(), None);
    }

    #[test]
    fn test_sales_team_performance() {
        let t = sales_team_performance(&store()).unwrap();
        assert_eq!(keys(&t), vec!["Ann", "Bob", "Cid"]);
        assert_eq!(t.value("Ann", TRANSACTION_COUNT).unwrap(), Some(2.0));
        assert_eq!(t.value("Ann", SALES_PER_TRANSACTION).unwrap(), Some(150.0));
    }

    #[test]
    fn test_geographic_performance_counts_people() {
        let t = geographic_performance(&store()).unwrap();
        assert_eq!(t.columns().last().unwrap(), NUMBER_OF_SALES_PEOPLE);
        assert_eq!(t.value("UK", NUMBER_OF_SALES_PEOPLE).unwrap(), Some(1.0));
        assert_eq!(t.value("UK", TRANSACTION_COUNT).unwrap(), Some(2.0));
    }

    #[test]
    fn test_monthly_trends_in_month_order() {
        let t = monthly_trends(&store()).unwrap();
        assert_eq!(t.key_name(), "Month");
        assert_eq!(keys(&t), vec!["2022-01", "2022-02", "2022-03"]);
        assert_eq!(t.value("2022-01", TOTAL_SALES).unwrap(), Some(250.0));
        assert_eq!(t.value("2022-01", ACTIVE_SALES_PEOPLE).unwrap(), Some(2.0));
    }

    #[test]
    fn test_overall_and_limit() {
        let s = store();
        let total = s
            .query()
            .aggregate_as(Measure::Sales, Statistic::Sum, TOTAL_SALES)
            .execute()
            .unwrap();
        assert_eq!(total.value("All", TOTAL_SALES).unwrap(), Some(400.0));

        let top = sales_by_category(&s, Attribute::Product).unwrap().head(1);
        assert_eq!(keys(&top), vec!["B"]);
        let limited = s
            .query()
            .group_by(ByAttribute(Attribute::Geography))
            .aggregate_as(Measure::Sales, Statistic::Sum, TOTAL_SALES)
            .rank_by(TOTAL_SALES, Direction::Ascending)
            .limit(2)
            .execute()
            .unwrap();
        assert_eq!(keys(&limited), vec!["India", "USA"]);
    }

    #[test]
    fn test_rank_by_unknown_column_fails() {
        let res = store()
            .query()
            .group_by(ByMonth)
            .aggregate_as(Measure::Sales, Statistic::Sum, TOTAL_SALES)
            .rank_by("Nope", Direction::Descending)
            .execute();
        assert!(matches!(res, Err(RollupError::MissingColumn(_))));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let s = store();
        let seq = standard_reports(&s).unwrap();
        let par = standard_reports_parallel(&s).unwrap();
        let seq_names: Vec<&str> = seq.names().collect();
        let par_names: Vec<&str> = par.names().collect();
        assert_eq!(seq_names, vec![PRODUCT_ANALYSIS, GEOGRAPHIC_ANALYSIS, SALES_TEAM_ANALYSIS, MONTHLY_TRENDS]);
        assert_eq!(seq_names, par_names);
        for ((_, a), (_, b)) in seq.iter().zip(par.iter()) {
            assert_eq!(a, b);
        }
    }
}
