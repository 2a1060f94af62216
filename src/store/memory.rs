use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{KvStore, Reply, StoreOp};
use crate::error::StoreError;

/// In-memory store for tests and local development.
///
/// One mutex is held for the length of each batch, giving the same
/// all-or-nothing visibility as a Redis `MULTI`/`EXEC`. Expirations are
/// recorded but never enforced; inspect them with
/// [`MemoryStore::expires_at`].
#[derive(Default)]
pub struct MemoryStore {
    shards: Mutex<HashMap<String, Shard>>,
    batches: AtomicU64,
}

#[derive(Default)]
struct Shard {
    fields: HashMap<i64, i64>,
    expires_at: Option<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many batches have reached the store. Lets tests assert that
    /// validation failures issue no I/O.
    pub fn batch_count(&self) -> u64 {
        self.batches.load(Ordering::SeqCst)
    }

    /// The recorded expiry timestamp for a shard, if any.
    pub fn expires_at(&self, shard_key: &str) -> Option<i64> {
        self.shards
            .lock()
            .get(shard_key)
            .and_then(|s| s.expires_at)
    }

    /// Read a field directly, bypassing the batch protocol.
    pub fn field(&self, shard_key: &str, field: i64) -> Option<i64> {
        self.shards
            .lock()
            .get(shard_key)
            .and_then(|s| s.fields.get(&field).copied())
    }

    pub fn shard_count(&self) -> usize {
        self.shards.lock().len()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn exec_batch(&self, ops: Vec<StoreOp>) -> Result<Vec<Reply>, StoreError> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        self.batches.fetch_add(1, Ordering::SeqCst);

        let mut shards = self.shards.lock();
        let replies = ops
            .into_iter()
            .map(|op| match op {
                StoreOp::HashIncr { key, field, delta } => {
                    let slot = shards
                        .entry(key)
                        .or_default()
                        .fields
                        .entry(field)
                        .or_insert(0);
                    *slot += delta;
                    Reply::Int(*slot)
                }
                StoreOp::HashSet { key, field, value } => {
                    shards.entry(key).or_default().fields.insert(field, value);
                    Reply::Unit
                }
                StoreOp::HashGet { key, field } => Reply::Value(
                    shards
                        .get(&key)
                        .and_then(|s| s.fields.get(&field).copied()),
                ),
                StoreOp::ExpireAt { key, at } => {
                    shards.entry(key).or_default().expires_at = Some(at);
                    Reply::Unit
                }
            })
            .collect();

        Ok(replies)
    }
}
