//! Checkpoint driven offset planning for incremental ingestion from a partitioned, append-only log.
//!
//! Every ingestion cycle the [planner] takes the previous checkpoint, asks the broker (through a
//! [PartitionSnapshotFetcher]) where every partition starts and ends, and returns the exact
//! `[from, until)` range to read per partition together with the checkpoint to persist after the
//! read was committed downstream. Nothing here reads records or persists checkpoints.

pub mod error;
pub use error::{Error, Result};

/// Partition identity, offset ranges and offset mappings.
pub mod partition;
pub use partition::{OffsetMapping, OffsetRange, PartitionId};

/// Encoding and decoding of the persisted checkpoint string.
pub mod checkpoint;
pub use checkpoint::Checkpoint;

/// The broker seam.
pub mod fetcher;
pub use fetcher::PartitionSnapshotFetcher;

/// Start offsets when there is no checkpoint.
pub mod reset;
pub use reset::ResetStrategy;

/// Retention check of a previous checkpoint.
pub mod validator;

pub mod allocator;

pub mod config;
pub use config::{NewPartitionStart, PlannerConfig};

/// Per-cycle entry point gluing everything together.
pub mod planner;
pub use planner::{CyclePlan, OffsetPlanner, plan_next_cycle};

#[cfg(test)]
pub(crate) mod test_utils;
