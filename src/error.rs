//! Error taxonomy: configuration problems, synchronous query validation
//! failures, and errors surfaced by the key-value store.

use thiserror::Error;

/// Rejected at construction time, before a handle exists.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("granularity `{0}`: duration must be positive")]
    NonPositiveDuration(String),

    #[error("granularity `{0}`: ttl must cover at least one bucket")]
    TtlTooShort(String),

    #[error("granularity `{0}` configured twice")]
    DuplicateGranularity(String),
}

/// A failure surfaced by the key-value store. Propagated verbatim —
/// no retry policy exists at this layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("store returned {got} replies for {expected} queued operations")]
    ReplyCount { expected: usize, got: usize },

    #[error("store returned a reply of the wrong kind for a queued operation")]
    UnexpectedReply,
}

/// Anything a record/flush/query call can fail with.
///
/// The validation variants are raised synchronously, before any I/O is
/// issued; [`TimeSeriesError::Store`] aborts the whole operation with no
/// partial results.
#[derive(Debug, Error)]
pub enum TimeSeriesError {
    #[error("unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    #[error("requested {requested} buckets but only {max} are retained")]
    CountExceeded { requested: usize, max: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}
