//! Windowed queries: reconstructing an ordered, gap-filled time series
//! from one atomic multi-read.

use crate::clock::Clock;
use crate::error::TimeSeriesError;
use crate::granularity::Granularity;
use crate::keys;
use crate::series::TimeSeries;
use crate::store::{KvStore, StoreOp};

// ─── Options ─────────────────────────────────────────────────────

/// Options for [`TimeSeries::get_hits`].
#[derive(Debug, Clone, Copy)]
pub struct HitsOptions {
    /// How many trailing buckets to return. Defaults to the full retained
    /// horizon (`ttl / duration`); asking for more is an error.
    pub count: Option<usize>,
    /// Emit `0` for buckets with no recorded hits instead of omitting
    /// them. Defaults to `true`.
    pub backfill: bool,
}

impl Default for HitsOptions {
    fn default() -> Self {
        Self {
            count: None,
            backfill: true,
        }
    }
}

/// Options for [`TimeSeries::get_values`].
#[derive(Debug, Clone, Copy)]
pub struct ValuesOptions {
    /// How many trailing buckets to return. Defaults to the full retained
    /// horizon.
    pub count: Option<usize>,
    /// Emit a point for buckets with no recorded sample instead of
    /// omitting them. Defaults to `true`.
    pub backfill: bool,
    /// When backfilling a gap, carry the most recent known sample forward;
    /// if `false`, the gap is emitted with no value. Defaults to `true`.
    pub backfill_last_value: bool,
}

impl Default for ValuesOptions {
    fn default() -> Self {
        Self {
            count: None,
            backfill: true,
            backfill_last_value: true,
        }
    }
}

// ─── Output points ───────────────────────────────────────────────

/// One bucket of a hit-count series: bucket start timestamp and the
/// (possibly backfilled-to-zero) count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub ts: i64,
    pub value: i64,
}

/// One bucket of a sampled-value series. `value` is `None` only for a
/// gap that was backfilled without carry-forward, or a gap preceding the
/// first retained sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePoint {
    pub ts: i64,
    pub value: Option<i64>,
}

// ─── Query engine ────────────────────────────────────────────────

impl<S: KvStore, C: Clock> TimeSeries<S, C> {
    /// Hit counts for the last `count` buckets of a granularity, oldest
    /// first.
    ///
    /// Fails synchronously — before any store I/O — if the granularity is
    /// unknown or `count` exceeds the retained horizon. A store error
    /// aborts the call with no partial results.
    pub async fn get_hits(
        &self,
        key: &str,
        granularity: &str,
        opts: HitsOptions,
    ) -> Result<Vec<Point>, TimeSeriesError> {
        let gran = self.lookup(granularity)?;
        let count = self.window_count(opts.count, gran)?;

        let now = self.clock.now();
        let duration = gran.duration;
        let to = keys::round_time(duration, now);
        let from = keys::round_time(duration, now - count as i64 * duration);

        let replies = self
            .store
            .exec_batch(self.bucket_reads(key, granularity, gran, from, to))
            .await?;

        let mut points = Vec::with_capacity(replies.len());
        let mut ts = from;
        for reply in replies {
            match reply.into_value()? {
                Some(v) => points.push(Point { ts, value: v }),
                None if opts.backfill => points.push(Point { ts, value: 0 }),
                None => {}
            }
            ts += duration;
        }

        // The inclusive scan can yield one extra leading bucket from
        // boundary rounding; keep only the trailing `count`.
        points.drain(..points.len().saturating_sub(count));
        Ok(points)
    }

    /// Sampled values for the last `count` buckets of a granularity,
    /// oldest first, with last-value-carry-forward gap filling.
    ///
    /// Buckets older than the window but still retained are scanned (in
    /// the same atomic read) purely to seed the carried-forward value;
    /// they are never emitted. Validation and failure semantics match
    /// [`TimeSeries::get_hits`].
    pub async fn get_values(
        &self,
        key: &str,
        granularity: &str,
        opts: ValuesOptions,
    ) -> Result<Vec<SamplePoint>, TimeSeriesError> {
        let gran = self.lookup(granularity)?;
        let count = self.window_count(opts.count, gran)?;

        let now = self.clock.now();
        let duration = gran.duration;
        let to = keys::round_time(duration, now);
        let from = keys::round_time(duration, now - count as i64 * duration);
        let back_from = keys::round_time(
            duration,
            now - gran.retained_buckets() * duration,
        );

        let replies = self
            .store
            .exec_batch(self.bucket_reads(key, granularity, gran, back_from, to))
            .await?;

        let mut latest: Option<i64> = None;
        let mut points = Vec::new();
        let mut ts = back_from;
        for reply in replies {
            let stored = reply.into_value()?;
            if ts < from {
                // Seed region: remember the most recent sample preceding
                // the window, emit nothing.
                if let Some(v) = stored {
                    latest = Some(v);
                }
            } else {
                match stored {
                    Some(v) => {
                        latest = Some(v);
                        points.push(SamplePoint {
                            ts,
                            value: latest,
                        });
                    }
                    None if opts.backfill => points.push(SamplePoint {
                        ts,
                        value: if opts.backfill_last_value {
                            latest
                        } else {
                            None
                        },
                    }),
                    None => {}
                }
            }
            ts += duration;
        }

        points.drain(..points.len().saturating_sub(count));
        Ok(points)
    }

    // ── Shared plumbing ─────────────────────────────────────────

    fn lookup(&self, granularity: &str) -> Result<Granularity, TimeSeriesError> {
        self.granularities
            .get(granularity)
            .ok_or_else(|| TimeSeriesError::UnsupportedGranularity(granularity.into()))
    }

    fn window_count(
        &self,
        requested: Option<usize>,
        gran: Granularity,
    ) -> Result<usize, TimeSeriesError> {
        let max = gran.retained_buckets() as usize;
        let count = requested.unwrap_or(max);
        if count > max {
            return Err(TimeSeriesError::CountExceeded {
                requested: count,
                max,
            });
        }
        Ok(count)
    }

    /// One `HashGet` per bucket boundary in `[from, to]`, stepping the
    /// bucket duration.
    fn bucket_reads(
        &self,
        key: &str,
        gran_name: &str,
        gran: Granularity,
        from: i64,
        to: i64,
    ) -> Vec<StoreOp> {
        let mut ops =
            Vec::with_capacity(((to - from) / gran.duration + 1).max(0) as usize);
        let mut ts = from;
        while ts <= to {
            let loc = keys::derive_location(&self.namespace, key, gran_name, gran, ts);
            ops.push(StoreOp::HashGet {
                key: loc.shard_key,
                field: loc.field,
            });
            ts += gran.duration;
        }
        ops
    }
}
