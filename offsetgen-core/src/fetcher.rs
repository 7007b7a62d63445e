use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::partition::{OffsetMapping, PartitionId};

/// PartitionSnapshotFetcher is the seam to the broker. Any log technology that can list the
/// partitions of a log and report the earliest retained and the current end offset per partition
/// can be plugged in without touching the planner.
///
/// Implementations may fan out the lookups concurrently, but must only return once every requested
/// partition has been answered. Any failure is reported as [Error::BrokerUnavailable] and aborts the
/// planning cycle.
#[trait_variant::make(Send)]
pub trait PartitionSnapshotFetcher {
    /// Lists the partitions currently known for `log_name`.
    async fn list_partitions(&self, log_name: &str) -> Result<BTreeSet<PartitionId>>;

    /// Returns the earliest still retained offset for every partition in `partitions`.
    async fn earliest_offsets(&self, partitions: &BTreeSet<PartitionId>) -> Result<OffsetMapping>;

    /// Returns the current end offset (offset of the next record to be written) for every
    /// partition in `partitions`.
    async fn end_offsets(&self, partitions: &BTreeSet<PartitionId>) -> Result<OffsetMapping>;
}

/// Fails if the fetcher left out any of the requested partitions, so that the planner never works
/// with a partial snapshot.
pub(crate) fn ensure_complete(
    kind: &str,
    partitions: &BTreeSet<PartitionId>,
    offsets: &OffsetMapping,
) -> Result<()> {
    match partitions.iter().find(|p| !offsets.contains(p)) {
        Some(missing) => Err(Error::BrokerUnavailable(format!(
            "no {kind} offset reported for partition {missing}"
        ))),
        None => Ok(()),
    }
}
