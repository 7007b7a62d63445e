use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::Serialize;

/// Identity of one ordered sub-log. Ordering is by log name first and then by partition index, so
/// anything keyed by [PartitionId] iterates partitions of a log in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PartitionId {
    pub log_name: String,
    pub partition: i32,
}

impl PartitionId {
    pub fn new(log_name: impl Into<String>, partition: i32) -> Self {
        PartitionId {
            log_name: log_name.into(),
            partition,
        }
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.log_name, self.partition)
    }
}

/// A half-open `[from, until)` slice of a partition to be read in this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetRange {
    pub partition: PartitionId,
    pub from: i64,
    pub until: i64,
}

impl OffsetRange {
    /// Number of records the range yields.
    pub fn count(&self) -> i64 {
        self.until - self.from
    }
}

impl fmt::Display for OffsetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}->{}", self.partition, self.from, self.until)
    }
}

/// Partition to offset mapping. Used both for the "from" side (last consumed position, may be
/// partial) and the "to" side (current upper bound, one entry per known partition).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMapping(BTreeMap<PartitionId, i64>);

impl OffsetMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, partition: PartitionId, offset: i64) -> Option<i64> {
        self.0.insert(partition, offset)
    }

    pub fn get(&self, partition: &PartitionId) -> Option<i64> {
        self.0.get(partition).copied()
    }

    pub fn contains(&self, partition: &PartitionId) -> bool {
        self.0.contains_key(partition)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn partitions(&self) -> impl Iterator<Item = &PartitionId> {
        self.0.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PartitionId, i64> {
        self.0.iter()
    }
}

impl FromIterator<(PartitionId, i64)> for OffsetMapping {
    fn from_iter<T: IntoIterator<Item = (PartitionId, i64)>>(iter: T) -> Self {
        OffsetMapping(iter.into_iter().collect())
    }
}

impl Extend<(PartitionId, i64)> for OffsetMapping {
    fn extend<T: IntoIterator<Item = (PartitionId, i64)>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl IntoIterator for OffsetMapping {
    type Item = (PartitionId, i64);
    type IntoIter = btree_map::IntoIter<PartitionId, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a OffsetMapping {
    type Item = (&'a PartitionId, &'a i64);
    type IntoIter = btree_map::Iter<'a, PartitionId, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for OffsetMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .0
            .iter()
            .map(|(p, o)| format!("{p}={o}"))
            .collect::<Vec<String>>()
            .join(", ");
        write!(f, "{{{entries}}}")
    }
}
