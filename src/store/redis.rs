use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{KvStore, Reply, StoreOp};
use crate::error::StoreError;

/// Redis-backed store. Batches map to `MULTI`/`EXEC` pipelines, so a
/// flush or a query's reads apply as one indivisible unit server-side.
///
/// `ConnectionManager` is cheaply cloneable and auto-reconnects — every
/// clone shares the same underlying multiplexed TCP connection, so one
/// `RedisStore` can back any number of handles.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Wrap an existing connection.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Open a URL like `redis://127.0.0.1:6379/` and wrap the resulting
    /// auto-reconnecting connection.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(StoreError::Redis)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(StoreError::Redis)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn exec_batch(&self, ops: Vec<StoreOp>) -> Result<Vec<Reply>, StoreError> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            match op {
                StoreOp::HashIncr { key, field, delta } => {
                    pipe.hincr(key, *field, *delta);
                }
                StoreOp::HashSet { key, field, value } => {
                    pipe.hset(key, *field, *value);
                }
                StoreOp::HashGet { key, field } => {
                    pipe.hget(key, *field);
                }
                StoreOp::ExpireAt { key, at } => {
                    pipe.expire_at(key, *at);
                }
            }
        }

        let mut conn = self.conn.clone();
        let raw: Vec<redis::Value> = pipe
            .query_async(&mut conn)
            .await
            .map_err(StoreError::Redis)?;

        if raw.len() != ops.len() {
            return Err(StoreError::ReplyCount {
                expected: ops.len(),
                got: raw.len(),
            });
        }

        ops.iter()
            .zip(raw)
            .map(|(op, value)| decode_reply(op, value))
            .collect()
    }
}

/// Convert one raw Redis value back into the [`Reply`] shape its queued
/// operation promised.
fn decode_reply(op: &StoreOp, value: redis::Value) -> Result<Reply, StoreError> {
    match op {
        StoreOp::HashIncr { .. } => {
            let n: i64 = redis::from_redis_value(&value).map_err(StoreError::Redis)?;
            Ok(Reply::Int(n))
        }
        // HSET/EXPIREAT reply with status integers we have no use for.
        StoreOp::HashSet { .. } | StoreOp::ExpireAt { .. } => Ok(Reply::Unit),
        StoreOp::HashGet { .. } => {
            let v: Option<i64> =
                redis::from_redis_value(&value).map_err(StoreError::Redis)?;
            Ok(Reply::Value(v))
        }
    }
}
