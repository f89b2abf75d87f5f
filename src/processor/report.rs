use std::sync::Arc;

use crate::processor::RollupError;
use crate::processor::table::ResultTable;

pub const PRODUCT_ANALYSIS: &str = "Product Analysis";
pub const GEOGRAPHIC_ANALYSIS: &str = "Geographic Analysis";
pub const SALES_TEAM_ANALYSIS: &str = "Sales Team Analysis";
pub const MONTHLY_TRENDS: &str = "Monthly Trends";

/// Named result tables for joint export, in the order they were supplied
#[derive(Debug, Clone, Default)]
pub struct ReportBundle {
    reports: Vec<(String, Arc<ResultTable>)>,
}

impl ReportBundle {
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ResultTable> {
        self.reports
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.reports.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultTable)> + '_ {
        self.reports.iter().map(|(n, t)| (n.as_str(), t.as_ref()))
    }
}

/// Bundles tables under their names without recomputing anything.
///
/// # Errors
/// [`RollupError::DuplicateReportName`] if a name is supplied twice.
pub fn assemble<I, T>(named_tables: I) -> Result<ReportBundle, RollupError>
where
    I: IntoIterator<Item = (String, T)>,
    T: Into<Arc<ResultTable>>,
{
    let mut reports: Vec<(String, Arc<ResultTable>)> = Vec::new();
    for (name, table) in named_tables {
        if reports.iter().any(|(n, _)| *n == name) {
            return Err(RollupError::DuplicateReportName(name));
        }
        reports.push((name, table.into()));
    }
    Ok(ReportBundle { reports })
}
