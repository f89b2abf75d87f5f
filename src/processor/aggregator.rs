use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::processor::grouper::{Group, Groups};
use crate::processor::table::{AggregateRow, ResultTable};
use crate::processor::{Attribute, Measure, MetricValue, RollupError, Statistic};

/// One output column of an aggregation. The column name is always supplied by
/// the caller; only valid column/statistic pairs can be expressed.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSpec {
    /// A statistic over a numeric column
    Stat {
        measure: Measure,
        statistic: Statistic,
        name: String,
    },
    /// Number of distinct values of an identifier column within the group
    Distinct { attribute: Attribute, name: String },
}

impl MetricSpec {
    pub fn stat(measure: Measure, statistic: Statistic, name: &str) -> Self {
        MetricSpec::Stat {
            measure,
            statistic,
            name: name.to_string(),
        }
    }

    pub fn distinct(attribute: Attribute, name: &str) -> Self {
        MetricSpec::Distinct {
            attribute,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MetricSpec::Stat { name, .. } | MetricSpec::Distinct { name, .. } => name,
        }
    }
}

/// Running moments of one measure within one group
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    count: usize,
    sum: f64,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        let delta = v - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (v - self.mean);
    }

    fn statistic(&self, statistic: Statistic) -> MetricValue {
        match statistic {
            Statistic::Sum => Some(self.sum),
            Statistic::Count => Some(self.count as f64),
            Statistic::Mean if self.count == 0 => None,
            Statistic::Mean => Some(self.sum / self.count as f64),
            Statistic::StdDev if self.count < 2 => None,
            Statistic::StdDev => Some((self.m2 / (self.count - 1) as f64).sqrt()),
        }
    }
}

/// Computes every spec for every group, one row per group in group order.
///
/// # Errors
/// [`RollupError::DuplicateColumn`] if two specs share a name.
pub fn aggregate(groups: &Groups<'_>, specs: &[MetricSpec]) -> Result<ResultTable, RollupError> {
    let columns: Vec<String> = specs.iter().map(|s| s.name().to_string()).collect();
    let mut table = ResultTable::new(groups.key_name(), columns)?;

    let mut distinct: HashMap<Attribute, Vec<usize>> = HashMap::new();
    for spec in specs {
        if let MetricSpec::Distinct { attribute, .. } = spec {
            distinct
                .entry(*attribute)
                .or_insert_with(|| distinct_counts(groups, *attribute));
        }
    }

    for (gi, group) in groups.iter().enumerate() {
        let mut moments: HashMap<Measure, Moments> = HashMap::new();
        let values = specs
            .iter()
            .map(|spec| match spec {
                MetricSpec::Stat {
                    measure, statistic, ..
                } => moments
                    .entry(*measure)
                    .or_insert_with(|| measure_moments(groups, group, *measure))
                    .statistic(*statistic),
                MetricSpec::Distinct { attribute, .. } => {
                    distinct.get(attribute).map(|counts| counts[gi] as f64)
                }
            })
            .collect();

        table.push_row(AggregateRow::new(group.key.clone(), values));
    }

    debug!(
        dimension = groups.key_name(),
        rows = table.len(),
        metrics = specs.len(),
        "aggregated groups"
    );

    Ok(table)
}

fn measure_moments(groups: &Groups<'_>, group: &Group, measure: Measure) -> Moments {
    let mut m = Moments::default();
    for record in groups.records(group) {
        m.push(record.measure(measure));
    }
    m
}

/// Distinct values of `attribute` per group, counted by grouping records a
/// second time on (group, attribute value) pairs
fn distinct_counts(groups: &Groups<'_>, attribute: Attribute) -> Vec<usize> {
    let mut pairs: HashSet<(usize, &str)> = HashSet::new();
    for (gi, group) in groups.iter().enumerate() {
        for record in groups.records(group) {
            pairs.insert((gi, record.attribute(attribute)));
        }
    }

    let mut counts = vec![0usize; groups.len()];
    for (gi, _) in pairs {
        counts[gi] += 1;
    }
    counts
}
