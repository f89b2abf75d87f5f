use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::processor::RollupError;
use crate::processor::record::{RecordStore, SalesRecord, YearMonth};
use crate::processor::Attribute;

/// Grouping key produced by a [`Dimension`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// Category or entity identifier
    Label(String),
    /// Calendar month bucket
    Month(YearMonth),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Label(label) => f.write_str(label),
            GroupKey::Month(month) => month.fmt(f),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(label: &str) -> Self {
        GroupKey::Label(label.to_string())
    }
}

impl From<YearMonth> for GroupKey {
    fn from(month: YearMonth) -> Self {
        GroupKey::Month(month)
    }
}

/// Maps a record to the group it belongs to
pub trait Dimension {
    /// Name of the key column in result tables
    fn name(&self) -> &str;

    /// `None` means the record cannot be placed, which aborts grouping
    fn key(&self, record: &SalesRecord) -> Option<GroupKey>;
}

/// Group by one identifier column
#[derive(Debug, Clone, Copy)]
pub struct ByAttribute(pub Attribute);

impl Dimension for ByAttribute {
    fn name(&self) -> &str {
        self.0.column_name()
    }

    fn key(&self, record: &SalesRecord) -> Option<GroupKey> {
        Some(GroupKey::Label(record.attribute(self.0).to_string()))
    }
}

/// Group by calendar month of the record date
#[derive(Debug, Clone, Copy)]
pub struct ByMonth;

impl Dimension for ByMonth {
    fn name(&self) -> &str {
        "Month"
    }

    fn key(&self, record: &SalesRecord) -> Option<GroupKey> {
        Some(GroupKey::Month(record.month()))
    }
}

/// Single bucket holding every record, for grand totals
#[derive(Debug, Clone, Copy)]
pub struct Overall;

impl Dimension for Overall {
    fn name(&self) -> &str {
        "Overall"
    }

    fn key(&self, _record: &SalesRecord) -> Option<GroupKey> {
        Some(GroupKey::Label("All".to_string()))
    }
}

/// Ad-hoc dimension backed by a closure
pub struct FnDimension<F> {
    name: String,
    f: F,
}

impl<F> FnDimension<F>
where
    F: Fn(&SalesRecord) -> Option<GroupKey>,
{
    pub fn new(name: &str, f: F) -> Self {
        FnDimension {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> Dimension for FnDimension<F>
where
    F: Fn(&SalesRecord) -> Option<GroupKey>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn key(&self, record: &SalesRecord) -> Option<GroupKey> {
        (self.f)(record)
    }
}

/// One group: its key and the indices of its records in the store
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: GroupKey,
    pub rows: Vec<usize>,
}

/// Partition of a record store, in first-appearance order of the keys
#[derive(Debug, Clone)]
pub struct Groups<'a> {
    store: &'a RecordStore,
    key_name: String,
    groups: Vec<Group>,
}

impl<'a> Groups<'a> {
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> + '_ {
        self.groups.iter()
    }

    pub fn store(&self) -> &'a RecordStore {
        self.store
    }

    /// Records belonging to `group`
    pub fn records<'g>(&'g self, group: &'g Group) -> impl Iterator<Item = &'a SalesRecord> + 'g {
        let records = self.store.records();
        group.rows.iter().map(move |&i| &records[i])
    }
}

/// Partitions `store` by `dimension`.
///
/// Every record lands in exactly one group; groups come out in the order
/// their key first appears.
///
/// # Errors
/// [`RollupError::InvalidDimension`] if the dimension yields no key for a record.
pub fn group<'a, D>(store: &'a RecordStore, dimension: &D) -> Result<Groups<'a>, RollupError>
where
    D: Dimension + ?Sized,
{
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for (row, record) in store.iter().enumerate() {
        let key = dimension
            .key(record)
            .ok_or_else(|| RollupError::InvalidDimension {
                dimension: dimension.name().to_string(),
                row,
            })?;

        match index.get(&key) {
            Some(&slot) => groups[slot].rows.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    rows: vec![row],
                });
            }
        }
    }

    debug!(
        dimension = dimension.name(),
        records = store.len(),
        groups = groups.len(),
        "grouped records"
    );

    Ok(Groups {
        store,
        key_name: dimension.name().to_string(),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: (i32, u32, u32), person: &str, product: &str) -> SalesRecord {
        let date = NaiveDate::from_ymd_opt(day.0, day.1, day.2).unwrap();
        SalesRecord::new(date, person, "UK", product, 10.0, 1).unwrap()
    }

    fn store() -> RecordStore {
        RecordStore::new(vec![
            record((2022, 2, 1), "Ann", "B"),
            record((2022, 1, 5), "Bob", "A"),
            record((2022, 2, 9), "Ann", "B"),
            record((2022, 1, 7), "Cid", "C"),
        ])
    }

    #[test]
    fn test_group_first_appearance_order() {
        let store = store();
        let groups = group(&store, &ByAttribute(Attribute::Product)).unwrap();
        let keys: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
        assert_eq!(groups.key_name(), "Product");
    }

    #[test]
    fn test_group_covers_every_record_once() {
        let store = store();
        let groups = group(&store, &ByMonth).unwrap();
        let mut rows: Vec<usize> = groups.iter().flat_map(|g| g.rows.clone()).collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![0, 1, 2, 3]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_month_key() {
        let store = store();
        let groups = group(&store, &ByMonth).unwrap();
        let first = groups.iter().next().unwrap();
        assert_eq!(first.key.to_string(), "2022-02");
        assert_eq!(first.rows, vec![0, 2]);
    }

    #[test]
    fn test_invalid_dimension() {
        let store = store();
        let dim = FnDimension::new("Picky", |r: &SalesRecord| {
            (r.sales_person != "Bob").then(|| GroupKey::from(r.product.as_str()))
        });
        match group(&store, &dim) {
            Err(RollupError::InvalidDimension { dimension, row }) => {
                assert_eq!(dimension, "Picky");
                assert_eq!(row, 1);
            }
            other => panic!("Expected InvalidDimension, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_store_has_no_groups() {
        let store = RecordStore::default();
        let groups = group(&store, &ByMonth).unwrap();
        assert!(groups.is_empty());
    }
}
