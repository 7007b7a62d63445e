use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::allocator;
use crate::checkpoint::Checkpoint;
use crate::config::{NewPartitionStart, PlannerConfig};
use crate::error::{Error, Result};
use crate::fetcher::{PartitionSnapshotFetcher, ensure_complete};
use crate::partition::{OffsetMapping, OffsetRange, PartitionId};
use crate::reset::{self, ResetStrategy};
use crate::validator;

/// The outcome of one planning cycle: what to read now, and the checkpoint to persist once the
/// downstream work for these ranges has been committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CyclePlan {
    /// One range per partition, sorted by partition.
    pub ranges: Vec<OffsetRange>,
    pub checkpoint: String,
}

impl CyclePlan {
    pub fn total_new_messages(&self) -> i64 {
        allocator::total_new_messages(&self.ranges)
    }

    /// Nothing to read, callers may skip the cycle.
    pub fn is_empty(&self) -> bool {
        self.total_new_messages() == 0
    }
}

/// OffsetPlanner plans the offset ranges of one log, cycle after cycle. It is stateless between
/// cycles, the previous checkpoint is the only input carried over.
pub struct OffsetPlanner<F> {
    log_name: String,
    config: PlannerConfig,
    fetcher: F,
}

impl<F: PartitionSnapshotFetcher> OffsetPlanner<F> {
    pub fn new(log_name: impl Into<String>, config: PlannerConfig, fetcher: F) -> Self {
        OffsetPlanner {
            log_name: log_name.into(),
            config,
            fetcher,
        }
    }

    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    /// Plans the next cycle, reading at most `min(max_events_per_cycle, source_limit)` events.
    pub async fn next_offset_ranges(
        &self,
        last_checkpoint: Option<&str>,
        source_limit: i64,
    ) -> Result<CyclePlan> {
        let event_budget = self.config.max_events_per_cycle.min(source_limit);
        self.plan(last_checkpoint.unwrap_or_default(), event_budget)
            .await
    }

    /// Plans the next cycle with an explicit event budget.
    pub async fn plan(&self, previous_checkpoint: &str, event_budget: i64) -> Result<CyclePlan> {
        plan_cycle(
            &self.log_name,
            previous_checkpoint,
            event_budget,
            &self.config,
            &self.fetcher,
        )
        .await
    }
}

/// Computes the ranges to read in this cycle and the checkpoint that follows them. Nothing is
/// persisted, the returned checkpoint must only be stored after the ranges were committed
/// downstream. On error the previous checkpoint stays the point to retry from.
pub async fn plan_next_cycle<F: PartitionSnapshotFetcher>(
    log_name: &str,
    previous_checkpoint: &str,
    event_budget: i64,
    reset_strategy: ResetStrategy,
    fetcher: &F,
) -> Result<CyclePlan> {
    let config = PlannerConfig {
        reset_strategy,
        ..Default::default()
    };
    plan_cycle(log_name, previous_checkpoint, event_budget, &config, fetcher).await
}

async fn plan_cycle<F: PartitionSnapshotFetcher>(
    log_name: &str,
    previous_checkpoint: &str,
    event_budget: i64,
    config: &PlannerConfig,
    fetcher: &F,
) -> Result<CyclePlan> {
    let checkpoint = Checkpoint::decode(previous_checkpoint)?;
    if !checkpoint.is_empty() && checkpoint.log_name != log_name {
        return Err(Error::MalformedCheckpoint(format!(
            "checkpoint belongs to log '{}', expected '{log_name}'",
            checkpoint.log_name
        )));
    }

    let partitions = fetcher.list_partitions(log_name).await?;
    if partitions.is_empty() {
        return Err(Error::BrokerUnavailable(format!(
            "no partitions found for log '{log_name}'"
        )));
    }

    let mut from = if checkpoint.is_empty() {
        let resolved = reset::resolve(config.reset_strategy, fetcher, &partitions).await?;
        ensure_complete("start", &partitions, &resolved)?;
        resolved
    } else {
        validator::validate(checkpoint.offsets, fetcher, &partitions).await?
    };

    start_new_partitions(&mut from, &partitions, config.new_partition_start, fetcher).await?;

    let vanished = vanished_partitions(&from, &partitions);
    if !vanished.is_empty() {
        warn!(
            log_name,
            partitions = ?vanished,
            "Checkpointed partitions are no longer listed, dropping them"
        );
    }

    let to = fetcher.end_offsets(&partitions).await?;
    ensure_complete("end", &partitions, &to)?;

    let ranges = allocator::allocate(&from, &to, event_budget)?;
    let checkpoint = Checkpoint::from_ranges(log_name, &ranges).encode()?;

    let plan = CyclePlan { ranges, checkpoint };
    info!(
        log_name,
        partitions = plan.ranges.len(),
        event_budget,
        new_messages = plan.total_new_messages(),
        "Planned next cycle"
    );
    Ok(plan)
}

/// Partitions with a start offset that the broker does not list any more.
fn vanished_partitions(from: &OffsetMapping, partitions: &BTreeSet<PartitionId>) -> Vec<i32> {
    from.partitions()
        .filter(|p| !partitions.contains(p))
        .map(|p| p.partition)
        .collect()
}

/// Gives every listed partition without a start offset one, according to `policy`.
async fn start_new_partitions<F: PartitionSnapshotFetcher>(
    from: &mut OffsetMapping,
    partitions: &BTreeSet<PartitionId>,
    policy: NewPartitionStart,
    fetcher: &F,
) -> Result<()> {
    let discovered: BTreeSet<PartitionId> = partitions
        .iter()
        .filter(|p| !from.contains(p))
        .cloned()
        .collect();
    if discovered.is_empty() {
        return Ok(());
    }

    info!(
        partitions = ?discovered.iter().map(|p| p.partition).collect::<Vec<i32>>(),
        %policy,
        "Discovered partitions without a checkpoint"
    );
    match policy {
        NewPartitionStart::Zero => from.extend(discovered.into_iter().map(|p| (p, 0))),
        NewPartitionStart::Earliest => {
            let earliest = fetcher.earliest_offsets(&discovered).await?;
            ensure_complete("earliest", &discovered, &earliest)?;
            from.extend(earliest);
        }
    }
    Ok(())
}
