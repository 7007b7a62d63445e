use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The checkpoint string could not be parsed. Not retried, an operator has to fix or drop the
    /// checkpoint.
    #[error("Malformed Checkpoint - {0}")]
    MalformedCheckpoint(String),

    /// The broker could not answer a metadata or offset query. The whole cycle can be retried from
    /// the same checkpoint.
    #[error("Broker Unavailable - {0}")]
    BrokerUnavailable(String),

    #[error("Unsupported Reset Strategy - {0}")]
    UnsupportedResetStrategy(String),

    /// A caller handed in inputs that break the planner's preconditions (e.g. from > to).
    #[error("Invariant Violation - {0}")]
    InvariantViolation(String),

    #[error("Config Error - {0}")]
    Config(String),
}

impl Error {
    /// Only broker failures are transient, everything else needs a human or a code fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::BrokerUnavailable(_))
    }
}
