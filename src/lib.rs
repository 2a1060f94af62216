//! Approximate, multi-resolution time-series counters and samplers on top
//! of a key-value store (Redis in production).
//!
//! Events are recorded against a logical key and aggregated into
//! fixed-width time buckets at several granularities at once — per
//! second, per minute, per hour, per day by default. Record calls queue
//! locally and cost no I/O; [`TimeSeries::flush`] commits the queue as
//! one atomic batch. Sliding-window queries ([`TimeSeries::get_hits`],
//! [`TimeSeries::get_values`]) issue one atomic multi-read and rebuild an
//! ordered, gap-filled series.
//!
//! ```ignore
//! use timestats::{Config, HitsOptions, RedisStore, TimeSeries};
//!
//! let store = RedisStore::connect("redis://127.0.0.1:6379/").await?;
//! let ts = TimeSeries::new(store, Config::default());
//!
//! ts.hit("messages").hit("visits");
//! ts.flush().await?;
//!
//! let opts = HitsOptions { count: Some(5), ..Default::default() };
//! for point in ts.get_hits("messages", "1minute", opts).await? {
//!     println!("{} -> {}", point.ts, point.value);
//! }
//! ```
//!
//! Counts are approximate by design: flushes are best-effort (a failed
//! batch is not retried here) and queries are not isolated from
//! concurrent writers. Shards expire server-side, so old buckets vanish
//! without any deletion path in this crate.

pub mod clock;
pub mod error;
pub mod granularity;
mod keys;
pub mod query;
pub mod series;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, StoreError, TimeSeriesError};
pub use granularity::{Granularity, GranularityTable};
pub use query::{HitsOptions, Point, SamplePoint, ValuesOptions};
pub use series::{Config, TimeSeries};
pub use store::{KvStore, MemoryStore, RedisStore, Reply, StoreOp};
