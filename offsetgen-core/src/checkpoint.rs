//! Checkpoint string codec.
//!
//! A checkpoint is persisted as `<log>,<partition>:<offset>,<partition>:<offset>,...`, for example
//! `orders,0:1200,1:877,2:1300`. The empty string is the "no checkpoint" sentinel. The format is a
//! persisted artifact and must stay stable.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::partition::{OffsetMapping, OffsetRange, PartitionId};

const TOKEN_SEPARATOR: char = ',';
const OFFSET_SEPARATOR: char = ':';

/// Last-read offset per partition of a single log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    /// Empty only for the "no checkpoint" sentinel.
    pub log_name: String,
    pub offsets: OffsetMapping,
}

impl Checkpoint {
    pub fn new(log_name: impl Into<String>, offsets: OffsetMapping) -> Self {
        Checkpoint {
            log_name: log_name.into(),
            offsets,
        }
    }

    /// Builds the checkpoint for the next cycle from the `until` side of the planned ranges.
    pub fn from_ranges(log_name: impl Into<String>, ranges: &[OffsetRange]) -> Self {
        let offsets = ranges
            .iter()
            .map(|range| (range.partition.clone(), range.until))
            .collect();
        Checkpoint::new(log_name, offsets)
    }

    /// A checkpoint without offsets is treated exactly like no checkpoint at all.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Encodes the checkpoint, partitions are written in ascending order.
    pub fn encode(&self) -> Result<String> {
        encode(&self.log_name, &self.offsets)
    }

    pub fn decode(checkpoint: &str) -> Result<Self> {
        decode(checkpoint)
    }
}

impl FromStr for Checkpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode(s)
    }
}

/// Encodes the offsets of `log_name` into a checkpoint string. Every partition in `offsets` must
/// belong to `log_name`, multi-log checkpoints cannot be expressed in the format.
pub fn encode(log_name: &str, offsets: &OffsetMapping) -> Result<String> {
    if log_name.is_empty() {
        return Err(Error::InvariantViolation(
            "cannot encode a checkpoint without a log name".to_string(),
        ));
    }
    if log_name.contains(TOKEN_SEPARATOR) {
        return Err(Error::InvariantViolation(format!(
            "log name '{log_name}' contains the checkpoint separator '{TOKEN_SEPARATOR}'"
        )));
    }

    let mut encoded = String::from(log_name);
    for (partition, offset) in offsets {
        if partition.log_name != log_name {
            return Err(Error::InvariantViolation(format!(
                "partition {partition} does not belong to log '{log_name}'"
            )));
        }
        encoded.push(TOKEN_SEPARATOR);
        encoded.push_str(&format!("{}{OFFSET_SEPARATOR}{offset}", partition.partition));
    }
    Ok(encoded)
}

/// Decodes a checkpoint string. The empty string decodes to [Checkpoint::default].
pub fn decode(checkpoint: &str) -> Result<Checkpoint> {
    if checkpoint.is_empty() {
        return Ok(Checkpoint::default());
    }

    let mut tokens = checkpoint.split(TOKEN_SEPARATOR);
    let log_name = match tokens.next() {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(Error::MalformedCheckpoint(format!(
                "missing log name in checkpoint '{checkpoint}'"
            )));
        }
    };

    let mut offsets = OffsetMapping::new();
    for token in tokens {
        let (partition, offset) = parse_token(token)?;
        let partition = PartitionId::new(log_name, partition);
        if offsets.insert(partition.clone(), offset).is_some() {
            return Err(Error::MalformedCheckpoint(format!(
                "partition {partition} appears more than once"
            )));
        }
    }

    Ok(Checkpoint::new(log_name, offsets))
}

fn parse_token(token: &str) -> Result<(i32, i64)> {
    let (partition, offset) = token.split_once(OFFSET_SEPARATOR).ok_or_else(|| {
        Error::MalformedCheckpoint(format!(
            "token '{token}' is not of the form <partition>{OFFSET_SEPARATOR}<offset>"
        ))
    })?;

    let partition = partition.parse::<i32>().map_err(|e| {
        Error::MalformedCheckpoint(format!("invalid partition in token '{token}': {e}"))
    })?;
    let offset = offset.parse::<i64>().map_err(|e| {
        Error::MalformedCheckpoint(format!("invalid offset in token '{token}': {e}"))
    })?;

    Ok((partition, offset))
}
