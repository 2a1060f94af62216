//! End-to-end tests against the in-memory store with a manual clock.

use std::sync::Arc;

use async_trait::async_trait;
use timestats::granularity::{days, hours};
use timestats::{
    Config, Granularity, GranularityTable, HitsOptions, KvStore, ManualClock,
    MemoryStore, Reply, StoreError, StoreOp, TimeSeries, TimeSeriesError,
    ValuesOptions,
};

const T0: i64 = 1_700_000_000;

fn hourly_table() -> GranularityTable {
    GranularityTable::new([("1hour", Granularity::new(hours(1), days(7)))]).unwrap()
}

fn hourly(namespace: &str) -> Config {
    Config {
        namespace: namespace.into(),
        granularities: hourly_table(),
    }
}

fn series(config: Config) -> TimeSeries<Arc<MemoryStore>, Arc<ManualClock>> {
    TimeSeries::with_clock(
        Arc::new(MemoryStore::new()),
        config,
        Arc::new(ManualClock::new(T0)),
    )
}

fn hit_values(points: &[timestats::Point]) -> Vec<i64> {
    points.iter().map(|p| p.value).collect()
}

fn sample_values(points: &[timestats::SamplePoint]) -> Vec<Option<i64>> {
    points.iter().map(|p| p.value).collect()
}

// ─── Recording + basic queries ───────────────────────────────────

#[tokio::test]
async fn one_hit_lands_in_every_granularity() {
    let ts = series(Config::default());
    ts.hit("messages");
    ts.flush().await.unwrap();

    let names: Vec<String> = ts
        .granularities()
        .iter()
        .map(|(n, _)| n.to_string())
        .collect();
    for name in names {
        let points = ts
            .get_hits(
                "messages",
                &name,
                HitsOptions {
                    count: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(hit_values(&points), [1], "granularity {name}");
    }
}

#[tokio::test]
async fn hits_accumulate_and_removal_is_symmetric() {
    let ts = series(hourly("stats"));

    ts.record_hit("messages", Some(T0), 1)
        .record_hit("messages", Some(T0), 1);
    ts.flush().await.unwrap();

    let opts = HitsOptions {
        count: Some(1),
        ..Default::default()
    };
    let points = ts.get_hits("messages", "1hour", opts).await.unwrap();
    assert_eq!(hit_values(&points), [2]);

    ts.remove_hit("messages", Some(T0), 1);
    ts.remove_hit("messages", Some(T0), 1);
    ts.flush().await.unwrap();

    let points = ts.get_hits("messages", "1hour", opts).await.unwrap();
    assert_eq!(hit_values(&points), [0]);
}

#[tokio::test]
async fn values_overwrite_instead_of_accumulating() {
    let ts = series(hourly("stats"));

    ts.record_value("temp", Some(T0), 5)
        .record_value("temp", Some(T0), 7);
    ts.flush().await.unwrap();

    let points = ts
        .get_values(
            "temp",
            "1hour",
            ValuesOptions {
                count: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(sample_values(&points), [Some(7)]);
}

// ─── Gap filling ─────────────────────────────────────────────────

#[tokio::test]
async fn values_carry_forward_across_gaps() {
    let ts = series(hourly("stats"));

    ts.record_value("temp", Some(T0 - hours(6)), 3)
        .record_value("temp", Some(T0 - hours(2)), 2)
        .record_value("temp", Some(T0), 1);
    ts.flush().await.unwrap();

    // Buckets, oldest first: -3h (gap), -2h, -1h (gap), now. The -6h
    // sample sits outside the window and only seeds the carry-forward.
    let points = ts
        .get_values(
            "temp",
            "1hour",
            ValuesOptions {
                count: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        sample_values(&points),
        [Some(3), Some(2), Some(2), Some(1)]
    );

    let points = ts
        .get_values(
            "temp",
            "1hour",
            ValuesOptions {
                count: Some(4),
                backfill_last_value: false,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(sample_values(&points), [None, Some(2), None, Some(1)]);

    let points = ts
        .get_values(
            "temp",
            "1hour",
            ValuesOptions {
                count: Some(4),
                backfill: false,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(sample_values(&points), [Some(2), Some(1)]);
}

#[tokio::test]
async fn hits_backfill_zero_or_omit() {
    let ts = series(hourly("stats"));
    ts.record_hit("messages", Some(T0), 1);
    ts.flush().await.unwrap();

    let points = ts
        .get_hits(
            "messages",
            "1hour",
            HitsOptions {
                count: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(hit_values(&points), [0, 0, 0, 1]);

    let points = ts
        .get_hits(
            "messages",
            "1hour",
            HitsOptions {
                count: Some(4),
                backfill: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(hit_values(&points), [1]);
}

// ─── Validation ──────────────────────────────────────────────────

#[tokio::test]
async fn over_wide_window_fails_without_io() {
    let ts = series(hourly("stats"));
    let max = 7 * 24;

    let err = ts
        .get_hits(
            "messages",
            "1hour",
            HitsOptions {
                count: Some(max + 1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TimeSeriesError::CountExceeded { requested, max: m }
            if requested == max + 1 && m == max
    ));
    assert_eq!(ts.store().batch_count(), 0);
}

#[tokio::test]
async fn unknown_granularity_fails_without_io() {
    let ts = series(hourly("stats"));

    let err = ts
        .get_hits("messages", "fortnight", HitsOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TimeSeriesError::UnsupportedGranularity(ref g) if g == "fortnight"));

    let err = ts
        .get_values("messages", "fortnight", ValuesOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TimeSeriesError::UnsupportedGranularity(_)));
    assert_eq!(ts.store().batch_count(), 0);
}

// ─── Concurrency ─────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_keys_do_not_interfere() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));
    let workers = 8;

    let mut handles = Vec::with_capacity(workers);
    for i in 0..workers {
        let store = store.clone();
        let clock = clock.clone();
        handles.push(tokio::spawn(async move {
            let ts = TimeSeries::with_clock(store, hourly("stats"), clock);
            for _ in 0..=i {
                ts.record_hit(&format!("key_{i}"), Some(T0), 1);
            }
            ts.flush().await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let ts = TimeSeries::with_clock(store, hourly("stats"), clock);
    for i in 0..workers {
        let points = ts
            .get_hits(
                &format!("key_{i}"),
                "1hour",
                HitsOptions {
                    count: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(hit_values(&points), [i as i64 + 1], "key_{i}");
    }
}

/// Store that holds every batch until the test opens the gate.
struct GatedStore {
    inner: MemoryStore,
    gate: tokio::sync::Semaphore,
}

#[async_trait]
impl KvStore for GatedStore {
    async fn exec_batch(&self, ops: Vec<StoreOp>) -> Result<Vec<Reply>, StoreError> {
        let _permit = self.gate.acquire().await.expect("gate closed");
        self.inner.exec_batch(ops).await
    }
}

#[tokio::test]
async fn records_during_a_flush_land_in_the_next_batch() {
    let store = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        gate: tokio::sync::Semaphore::new(0),
    });
    let ts = Arc::new(TimeSeries::with_clock(
        store.clone(),
        hourly("stats"),
        Arc::new(ManualClock::new(T0)),
    ));

    ts.hit("messages");
    let in_flight = tokio::spawn({
        let ts = ts.clone();
        async move { ts.flush().await }
    });
    tokio::task::yield_now().await;

    // The first batch is swapped out but blocked in the store; this hit
    // must accumulate into the fresh queue.
    ts.hit("messages");
    assert_eq!(ts.pending_ops(), 2);

    store.gate.add_permits(2);
    let replies = in_flight.await.unwrap().unwrap();
    assert_eq!(replies.len(), 2);

    let replies = ts.flush().await.unwrap();
    assert_eq!(replies.len(), 2);
}

// ─── Store failures ──────────────────────────────────────────────

/// Store whose batches always fail.
struct BrokenStore;

#[async_trait]
impl KvStore for BrokenStore {
    async fn exec_batch(&self, _ops: Vec<StoreOp>) -> Result<Vec<Reply>, StoreError> {
        Err(StoreError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection reset",
        ))))
    }
}

#[tokio::test]
async fn failed_flush_does_not_poison_later_batches() {
    let ts = TimeSeries::with_clock(
        BrokenStore,
        hourly("stats"),
        Arc::new(ManualClock::new(T0)),
    );

    ts.hit("messages");
    let err = ts.flush().await.unwrap_err();
    assert!(matches!(err, TimeSeriesError::Store(_)));

    // The failed batch is gone, not re-queued; new records start clean.
    assert_eq!(ts.pending_ops(), 0);
    ts.hit("messages");
    assert_eq!(ts.pending_ops(), 2);
}

#[tokio::test]
async fn failed_read_returns_no_partial_results() {
    let ts = TimeSeries::with_clock(
        BrokenStore,
        hourly("stats"),
        Arc::new(ManualClock::new(T0)),
    );
    let err = ts
        .get_hits("messages", "1hour", HitsOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TimeSeriesError::Store(_)));
}
