use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;

use crate::error::{Error, Result};
use crate::reset::ResetStrategy;

const DEFAULT_MAX_EVENTS_PER_CYCLE: i64 = 1_000_000;

const ENV_MAX_EVENTS_PER_CYCLE: &str = "OFFSETGEN_MAX_EVENTS_PER_CYCLE";
const ENV_AUTO_OFFSET_RESET: &str = "OFFSETGEN_AUTO_OFFSET_RESET";
const ENV_NEW_PARTITION_START: &str = "OFFSETGEN_NEW_PARTITION_START";

/// Where a partition that has no entry in an otherwise valid checkpoint starts reading.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum NewPartitionStart {
    /// Offset 0. Only correct as long as the broker never trimmed the partition.
    #[default]
    Zero,
    /// The earliest offset still retained by the broker.
    Earliest,
}

impl TryFrom<&str> for NewPartitionStart {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "zero" => Ok(NewPartitionStart::Zero),
            "earliest" => Ok(NewPartitionStart::Earliest),
            _ => Err(Error::Config(format!(
                "invalid new partition start '{value}', must be 'zero' or 'earliest'"
            ))),
        }
    }
}

impl Display for NewPartitionStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewPartitionStart::Zero => write!(f, "zero"),
            NewPartitionStart::Earliest => write!(f, "earliest"),
        }
    }
}

/// Per-source planning configuration, fixed for the lifetime of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Upper bound on the events planned in one cycle, regardless of the source limit asked for.
    pub max_events_per_cycle: i64,
    pub reset_strategy: ResetStrategy,
    pub new_partition_start: NewPartitionStart,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            max_events_per_cycle: DEFAULT_MAX_EVENTS_PER_CYCLE,
            reset_strategy: ResetStrategy::default(),
            new_partition_start: NewPartitionStart::default(),
        }
    }
}

impl PlannerConfig {
    /// Loads the config from the given environment, unset variables fall back to the defaults.
    pub fn load(env_vars: &HashMap<String, String>) -> Result<Self> {
        let mut config = PlannerConfig::default();

        if let Some(max_events) = env_vars.get(ENV_MAX_EVENTS_PER_CYCLE) {
            config.max_events_per_cycle = max_events.parse::<i64>().map_err(|e| {
                Error::Config(format!(
                    "{ENV_MAX_EVENTS_PER_CYCLE} '{max_events}' is not a number: {e}"
                ))
            })?;
            if config.max_events_per_cycle <= 0 {
                return Err(Error::Config(format!(
                    "{ENV_MAX_EVENTS_PER_CYCLE} must be positive, got {max_events}"
                )));
            }
        }

        if let Some(reset) = env_vars.get(ENV_AUTO_OFFSET_RESET) {
            config.reset_strategy = reset.parse()?;
        }

        if let Some(start) = env_vars.get(ENV_NEW_PARTITION_START) {
            config.new_partition_start = start.as_str().try_into()?;
        }

        Ok(config)
    }
}
