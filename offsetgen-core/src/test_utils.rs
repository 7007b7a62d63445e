//! In-memory [PartitionSnapshotFetcher] for exercising the planner without a broker.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::fetcher::PartitionSnapshotFetcher;
use crate::partition::{OffsetMapping, PartitionId};

#[derive(Debug, Clone, Default)]
pub(crate) struct InMemoryFetcher {
    log_name: String,
    /// partition -> (earliest, end)
    watermarks: Vec<(i32, i64, i64)>,
    unavailable: bool,
    /// partitions left out of every earliest offsets answer
    missing_earliest: Vec<i32>,
    earliest_calls: Arc<AtomicUsize>,
    end_calls: Arc<AtomicUsize>,
}

impl InMemoryFetcher {
    pub(crate) fn new(log_name: &str) -> Self {
        InMemoryFetcher {
            log_name: log_name.to_string(),
            ..Default::default()
        }
    }

    /// Adds a partition whose retained records span `[earliest, end)`.
    pub(crate) fn with_partition(mut self, partition: i32, earliest: i64, end: i64) -> Self {
        self.watermarks.push((partition, earliest, end));
        self
    }

    /// Makes every call fail as if the broker was down.
    pub(crate) fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Leaves `partition` out of the earliest offsets answers, like a broker that timed out on
    /// one partition's lookup.
    pub(crate) fn without_earliest(mut self, partition: i32) -> Self {
        self.missing_earliest.push(partition);
        self
    }

    pub(crate) fn earliest_calls(&self) -> usize {
        self.earliest_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn end_calls(&self) -> usize {
        self.end_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(Error::BrokerUnavailable("broker is down".to_string()));
        }
        Ok(())
    }

    fn lookup(
        &self,
        partitions: &BTreeSet<PartitionId>,
        pick: impl Fn(i64, i64) -> i64,
    ) -> OffsetMapping {
        self.watermarks
            .iter()
            .map(|(p, earliest, end)| (PartitionId::new(&self.log_name, *p), pick(*earliest, *end)))
            .filter(|(p, _)| partitions.contains(p))
            .collect()
    }
}

impl PartitionSnapshotFetcher for InMemoryFetcher {
    async fn list_partitions(&self, log_name: &str) -> Result<BTreeSet<PartitionId>> {
        self.check_available()?;
        if log_name != self.log_name {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .watermarks
            .iter()
            .map(|(p, _, _)| PartitionId::new(log_name, *p))
            .collect())
    }

    async fn earliest_offsets(&self, partitions: &BTreeSet<PartitionId>) -> Result<OffsetMapping> {
        self.check_available()?;
        self.earliest_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lookup(partitions, |earliest, _| earliest)
            .into_iter()
            .filter(|(p, _)| !self.missing_earliest.contains(&p.partition))
            .collect())
    }

    async fn end_offsets(&self, partitions: &BTreeSet<PartitionId>) -> Result<OffsetMapping> {
        self.check_available()?;
        self.end_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup(partitions, |_, end| end))
    }
}

/// Builds a mapping for `log` from `(partition, offset)` pairs.
pub(crate) fn offsets(log: &str, entries: &[(i32, i64)]) -> OffsetMapping {
    entries
        .iter()
        .map(|(p, o)| (PartitionId::new(log, *p), *o))
        .collect()
}

/// Builds the partition set for `log`.
pub(crate) fn partitions(log: &str, ids: &[i32]) -> BTreeSet<PartitionId> {
    ids.iter().map(|p| PartitionId::new(log, *p)).collect()
}
