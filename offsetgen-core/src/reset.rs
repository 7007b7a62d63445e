use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use tracing::info;

use crate::error::{Error, Result};
use crate::fetcher::PartitionSnapshotFetcher;
use crate::partition::{OffsetMapping, PartitionId};

/// Where to start reading when there is no usable checkpoint.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ResetStrategy {
    /// Start from the earliest retained offset (a.k.a. `smallest`).
    Earliest,
    /// Start from the current end of the log, skipping the backlog (a.k.a. `largest`).
    #[default]
    Latest,
}

impl FromStr for ResetStrategy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "earliest" | "smallest" => Ok(ResetStrategy::Earliest),
            "latest" | "largest" => Ok(ResetStrategy::Latest),
            _ => Err(Error::UnsupportedResetStrategy(format!(
                "'{value}', must be one of 'earliest', 'smallest', 'latest' or 'largest'"
            ))),
        }
    }
}

impl Display for ResetStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetStrategy::Earliest => write!(f, "earliest"),
            ResetStrategy::Latest => write!(f, "latest"),
        }
    }
}

/// Resolves the starting offsets of `partitions` for the given strategy.
pub async fn resolve<F: PartitionSnapshotFetcher>(
    strategy: ResetStrategy,
    fetcher: &F,
    partitions: &BTreeSet<PartitionId>,
) -> Result<OffsetMapping> {
    info!(%strategy, partitions = partitions.len(), "No checkpoint, resolving start offsets");
    match strategy {
        ResetStrategy::Earliest => fetcher.earliest_offsets(partitions).await,
        ResetStrategy::Latest => fetcher.end_offsets(partitions).await,
    }
}
