use thiserror::Error;

/// A configuration which can't be turned into a cache
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: u64 },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("{leader_sets} leader sets per policy don't fit in {sets} sets")]
    TooManyLeaders { leader_sets: usize, sets: usize },

    #[error("{field} requires {requires}")]
    Requires {
        field: &'static str,
        requires: &'static str,
    },

    #[error("no caches configured")]
    NoCaches,
}

/// Errors raised while simulating a trace
#[derive(Debug, Error)]
pub enum SimError {
    #[error("trace length {0} is not a whole number of records")]
    PartialRecord(usize),

    #[error("malformed trace record {record}: {reason}")]
    MalformedRecord { record: usize, reason: &'static str },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
