//! Offset range allocation.
//!
//! Given where every partition was left off, where every partition currently ends and how many
//! events may be read in this cycle, [allocate] computes the `[from, until)` range to read from
//! each partition. The budget is handed out round-robin in shares of
//! `ceil(remaining / non-exhausted)`, recomputed on every pass. Partitions that run dry early give
//! their unused share back to the ones still growing, so a single large partition cannot starve the
//! rest and small partitions are always drained.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::partition::{OffsetMapping, OffsetRange, PartitionId};

/// Computes one range per partition of `to`, sorted by partition.
///
/// Partitions missing from `from` start at offset 0, entries of `from` for partitions not in `to`
/// are dropped. The sum of the range counts never exceeds `event_budget`, and equals it unless
/// every partition is drained to its `to` offset.
pub fn allocate(
    from: &OffsetMapping,
    to: &OffsetMapping,
    event_budget: i64,
) -> Result<Vec<OffsetRange>> {
    if event_budget < 0 {
        return Err(Error::InvariantViolation(format!(
            "event budget must not be negative, got {event_budget}"
        )));
    }
    if to.is_empty() {
        return Err(Error::InvariantViolation(
            "cannot allocate ranges without any partition to read from".to_string(),
        ));
    }

    let mut ranges = Vec::with_capacity(to.len());
    for (partition, to_offset) in to {
        let from_offset = from.get(partition).unwrap_or(0);
        if from_offset > *to_offset {
            return Err(Error::InvariantViolation(format!(
                "partition {partition} starts at {from_offset} which is past its end offset {to_offset}"
            )));
        }
        ranges.push(OffsetRange {
            partition: partition.clone(),
            from: from_offset,
            until: from_offset,
        });
    }

    let mut allocated: i64 = 0;
    let mut exhausted: BTreeSet<PartitionId> = BTreeSet::new();

    // guard on both conditions, the share below divides by the non-exhausted count
    while allocated < event_budget && exhausted.len() < ranges.len() {
        let remaining = event_budget - allocated;
        let share = div_ceil(remaining, (ranges.len() - exhausted.len()) as i64);

        for range in ranges.iter_mut() {
            if exhausted.contains(&range.partition) {
                continue;
            }
            let cap = to.get(&range.partition).unwrap_or(range.until);
            // never hand out more than what is left of the budget, the ceil share can overshoot
            let grant = share.min(event_budget - allocated);
            let candidate = cap.min(range.until.saturating_add(grant));
            if candidate == cap {
                exhausted.insert(range.partition.clone());
            }
            allocated += candidate - range.until;
            range.until = candidate;
        }
    }

    debug!(
        allocated,
        event_budget,
        partitions = ranges.len(),
        exhausted = exhausted.len(),
        "Allocated offset ranges"
    );
    Ok(ranges)
}

/// Total number of records covered by `ranges`.
pub fn total_new_messages(ranges: &[OffsetRange]) -> i64 {
    ranges.iter().map(OffsetRange::count).sum()
}

/// Ceiling division for a non-negative dividend and a positive divisor, without the overflow of
/// `(a + b - 1) / b`.
fn div_ceil(dividend: i64, divisor: i64) -> i64 {
    let quotient = dividend / divisor;
    if dividend % divisor == 0 {
        quotient
    } else {
        quotient + 1
    }
}
