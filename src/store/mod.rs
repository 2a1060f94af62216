//! The key-value store collaborator: the capability set the time series
//! needs from its backing store, plus the Redis and in-memory backends.

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;

// ─── Operations ──────────────────────────────────────────────────

/// One queued store command. Fields are bucket-start timestamps; values
/// are integers (counters or samples).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Atomically add `delta` to a hash field, initializing to 0 if absent.
    HashIncr { key: String, field: i64, delta: i64 },
    /// Atomically overwrite a hash field.
    HashSet { key: String, field: i64, value: i64 },
    /// Read a hash field, distinguishing "absent" from any stored value.
    HashGet { key: String, field: i64 },
    /// Schedule removal of the whole hash at/after a Unix timestamp.
    ExpireAt { key: String, at: i64 },
}

/// Per-operation result, in queued order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// New field value after a `HashIncr`.
    Int(i64),
    /// Acknowledgement of a `HashSet` or `ExpireAt`.
    Unit,
    /// `HashGet` result; `None` marks an absent field.
    Value(Option<i64>),
}

impl Reply {
    /// Unpack a `HashGet` reply.
    pub(crate) fn into_value(self) -> Result<Option<i64>, StoreError> {
        match self {
            Reply::Value(v) => Ok(v),
            _ => Err(StoreError::UnexpectedReply),
        }
    }
}

// ─── The store trait ─────────────────────────────────────────────

/// An external store offering atomic hash-field operations and an
/// all-or-nothing batch primitive.
///
/// `exec_batch` must apply the whole batch as one indivisible unit and
/// return one [`Reply`] per operation, in queued order. An empty batch
/// must complete successfully without touching the store.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn exec_batch(&self, ops: Vec<StoreOp>) -> Result<Vec<Reply>, StoreError>;
}

#[async_trait]
impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    async fn exec_batch(&self, ops: Vec<StoreOp>) -> Result<Vec<Reply>, StoreError> {
        (**self).exec_batch(ops).await
    }
}
