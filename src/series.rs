//! The `TimeSeries` handle: recording hits and sampled values into a
//! pending batch, and flushing that batch atomically.

use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::TimeSeriesError;
use crate::granularity::GranularityTable;
use crate::keys;
use crate::store::{KvStore, Reply, StoreOp};

// ─── Configuration ───────────────────────────────────────────────

/// Construction-time configuration for a [`TimeSeries`] handle.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix for every shard key.
    pub namespace: String,
    /// Resolutions every recorded event is fanned out to. Fixed for the
    /// lifetime of the handle.
    pub granularities: GranularityTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: "stats".into(),
            granularities: GranularityTable::default(),
        }
    }
}

// ─── The handle ──────────────────────────────────────────────────

/// Multi-resolution counter/sampler over a key-value store.
///
/// Record calls queue operations locally and perform no I/O; [`flush`]
/// commits everything queued since the last flush as one atomic batch.
/// Record calls return `&Self`, so they chain:
///
/// ```ignore
/// let ts = TimeSeries::new(RedisStore::connect(url).await?, Config::default());
/// ts.hit("messages").hit("visits");
/// ts.flush().await?;
/// ```
///
/// Timestamps are integer seconds since the Unix epoch; pass `None` to
/// use the injected clock's current time.
pub struct TimeSeries<S, C = SystemClock> {
    pub(crate) store: S,
    pub(crate) clock: C,
    pub(crate) namespace: String,
    pub(crate) granularities: GranularityTable,
    pending: Mutex<Vec<StoreOp>>,
}

impl<S: KvStore> TimeSeries<S> {
    /// Handle on the system clock.
    pub fn new(store: S, config: Config) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: KvStore, C: Clock> TimeSeries<S, C> {
    pub fn with_clock(store: S, config: Config, clock: C) -> Self {
        Self {
            store,
            clock,
            namespace: config.namespace,
            granularities: config.granularities,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn granularities(&self) -> &GranularityTable {
        &self.granularities
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Operations queued since the last flush.
    pub fn pending_ops(&self) -> usize {
        self.pending.lock().len()
    }

    // ── Recording ───────────────────────────────────────────────

    /// Count one hit for `key` at the current time.
    pub fn hit(&self, key: &str) -> &Self {
        self.record_hit(key, None, 1)
    }

    /// Count `increment` hits for `key` at `at` (defaults to now). For
    /// every configured granularity this queues an atomic increment of
    /// the bucket containing `at`, plus a refresh of the shard's expiry.
    /// Increments accumulate across calls until flushed.
    pub fn record_hit(&self, key: &str, at: Option<i64>, increment: i64) -> &Self {
        self.queue_all(key, at, |loc| StoreOp::HashIncr {
            key: loc.shard_key.clone(),
            field: loc.field,
            delta: increment,
        })
    }

    /// Symmetric decrement, not a deletion: the bucket keeps existing and
    /// may go negative.
    pub fn remove_hit(&self, key: &str, at: Option<i64>, decrement: i64) -> &Self {
        self.record_hit(key, at, -decrement)
    }

    /// Record a sampled scalar for `key` at `at` (defaults to now). Unlike
    /// hits this overwrites: the last value queued for a bucket before a
    /// flush wins, and a later flush overwrites an earlier one.
    pub fn record_value(&self, key: &str, at: Option<i64>, value: i64) -> &Self {
        self.queue_all(key, at, |loc| StoreOp::HashSet {
            key: loc.shard_key.clone(),
            field: loc.field,
            value,
        })
    }

    /// Fan one event out to every granularity: the bucket write produced
    /// by `op`, then the shard expiry refresh.
    fn queue_all(
        &self,
        key: &str,
        at: Option<i64>,
        op: impl Fn(&keys::ShardLocation) -> StoreOp,
    ) -> &Self {
        let t = at.unwrap_or_else(|| self.clock.now());

        let mut pending = self.pending.lock();
        for (name, gran) in self.granularities.iter() {
            let loc = keys::derive_location(&self.namespace, key, name, gran, t);
            pending.push(op(&loc));
            pending.push(StoreOp::ExpireAt {
                key: loc.shard_key,
                at: loc.expires_at,
            });
        }
        drop(pending);
        self
    }

    // ── Flushing ────────────────────────────────────────────────

    /// Commit everything queued since the last flush as one atomic batch.
    ///
    /// The pending queue is swapped out synchronously, before the store
    /// round-trip: record calls made while the commit is in flight land
    /// in the fresh queue and are untouched by this flush's outcome,
    /// success or failure. Flushing an empty queue is a no-op that
    /// resolves to an empty reply list without touching the store.
    pub async fn flush(&self) -> Result<Vec<Reply>, TimeSeriesError> {
        let ops = std::mem::take(&mut *self.pending.lock());
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.exec_batch(ops).await?)
    }
}

// ─── Tests ───────────────────────────────────────────────────────
