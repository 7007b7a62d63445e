use std::collections::BTreeSet;

use tracing::warn;

use crate::error::Result;
use crate::fetcher::{PartitionSnapshotFetcher, ensure_complete};
use crate::partition::{OffsetMapping, PartitionId};

/// Checks the checkpoint against the broker's retention. If any checkpointed offset is below the
/// earliest retained offset of its partition, the whole checkpoint is dropped and every partition
/// restarts from its earliest offset, keeping all partitions consistent in time. Otherwise the
/// checkpoint is returned unchanged.
///
/// Checkpointed partitions that are not in `partitions` any more are ignored. The broker must
/// report an earliest offset for every one of `partitions`, a partial answer is
/// [crate::Error::BrokerUnavailable].
pub async fn validate<F: PartitionSnapshotFetcher>(
    checkpoint: OffsetMapping,
    fetcher: &F,
    partitions: &BTreeSet<PartitionId>,
) -> Result<OffsetMapping> {
    let earliest = fetcher.earliest_offsets(partitions).await?;
    ensure_complete("earliest", partitions, &earliest)?;

    let stale = checkpoint.iter().find(|(partition, offset)| {
        earliest
            .get(partition)
            .is_some_and(|earliest_offset| **offset < earliest_offset)
    });

    match stale {
        Some((partition, offset)) => {
            warn!(
                %partition,
                checkpoint_offset = offset,
                earliest_offset = earliest.get(partition),
                "Checkpoint points at data no longer retained, resetting all partitions to earliest"
            );
            Ok(earliest)
        }
        None => Ok(checkpoint),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::{InMemoryFetcher, offsets, partitions};

    #[tokio::test]
    async fn test_valid_checkpoint_is_unchanged() {
        let fetcher = InMemoryFetcher::new("logs")
            .with_partition(0, 5, 100)
            .with_partition(1, 0, 100);
        let checkpoint = offsets("logs", &[(0, 5), (1, 60)]);

        let validated = validate(checkpoint.clone(), &fetcher, &partitions("logs", &[0, 1]))
            .await
            .unwrap();
        assert_eq!(validated, checkpoint);

        // validating again is a no-op
        let revalidated = validate(validated.clone(), &fetcher, &partitions("logs", &[0, 1]))
            .await
            .unwrap();
        assert_eq!(revalidated, validated);
    }

    #[tokio::test]
    async fn test_stale_partition_resets_everything() {
        let fetcher = InMemoryFetcher::new("logs")
            .with_partition(0, 50, 100)
            .with_partition(1, 20, 300);
        let checkpoint = offsets("logs", &[(0, 10), (1, 250)]);

        let validated = validate(checkpoint, &fetcher, &partitions("logs", &[0, 1]))
            .await
            .unwrap();
        // partition 1 was fine but is reset as well
        assert_eq!(validated, offsets("logs", &[(0, 50), (1, 20)]));
    }

    #[tokio::test]
    async fn test_new_partitions_are_not_stale() {
        let fetcher = InMemoryFetcher::new("logs")
            .with_partition(0, 0, 100)
            .with_partition(1, 40, 100);
        let checkpoint = offsets("logs", &[(0, 70)]);

        let validated = validate(checkpoint.clone(), &fetcher, &partitions("logs", &[0, 1]))
            .await
            .unwrap();
        assert_eq!(validated, checkpoint);
    }

    #[tokio::test]
    async fn test_vanished_partitions_are_ignored() {
        let fetcher = InMemoryFetcher::new("logs").with_partition(0, 10, 100);
        // partition 3 is gone from the broker, its offset can not be checked
        let checkpoint = offsets("logs", &[(0, 20), (3, 1)]);

        let validated = validate(checkpoint.clone(), &fetcher, &partitions("logs", &[0]))
            .await
            .unwrap();
        assert_eq!(validated, checkpoint);
    }

    #[tokio::test]
    async fn test_partial_earliest_answer_fails() {
        // partition 1 has aged out, but the broker does not report its earliest offset
        let fetcher = InMemoryFetcher::new("logs")
            .with_partition(0, 0, 100)
            .with_partition(1, 50, 100)
            .without_earliest(1);
        let checkpoint = offsets("logs", &[(0, 10), (1, 10)]);

        let result = validate(checkpoint, &fetcher, &partitions("logs", &[0, 1])).await;
        assert!(matches!(result, Err(Error::BrokerUnavailable(_))));
    }

    #[tokio::test]
    async fn test_partial_earliest_answer_fails_even_when_stale() {
        let fetcher = InMemoryFetcher::new("logs")
            .with_partition(0, 30, 100)
            .with_partition(1, 0, 100)
            .without_earliest(1);
        let checkpoint = offsets("logs", &[(0, 10), (1, 10)]);

        let result = validate(checkpoint, &fetcher, &partitions("logs", &[0, 1])).await;
        assert!(matches!(result, Err(Error::BrokerUnavailable(_))));
    }
}
