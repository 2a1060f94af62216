//! Illustrative caller: records a burst of hits every few seconds and
//! prints the trailing per-minute buckets. Not part of the library API.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use timestats::{Config, HitsOptions, RedisStore, TimeSeries};

#[tokio::main]
async fn main() {
    println!("timestats hitter — recording into redis://127.0.0.1:6379/");

    let store = RedisStore::connect("redis://127.0.0.1:6379/")
        .await
        .unwrap_or_else(|e| {
            eprintln!("❌ Cannot connect to Redis: {e}");
            eprintln!("   Make sure redis-server is running on localhost:6379");
            std::process::exit(1);
        });

    let ts = TimeSeries::new(store, Config::default());

    // Deterministic RNG so re-runs produce the same traffic shape.
    let mut rng = StdRng::seed_from_u64(42);
    let mut tick = tokio::time::interval(Duration::from_secs(5));

    loop {
        tick.tick().await;

        let burst = rng.gen_range(1..=5);
        for _ in 0..burst {
            ts.hit("messages");
        }
        ts.hit("visits");

        match ts.flush().await {
            Ok(replies) => println!("flushed {} ops ({burst} message hits)", replies.len()),
            Err(e) => {
                eprintln!("flush failed: {e}");
                continue;
            }
        }

        let opts = HitsOptions {
            count: Some(5),
            ..Default::default()
        };
        match ts.get_hits("messages", "1minute", opts).await {
            Ok(points) => {
                let line: Vec<String> = points
                    .iter()
                    .map(|p| format!("{}={}", p.ts, p.value))
                    .collect();
                println!("last 5 minutes: {}", line.join(" "));
            }
            Err(e) => eprintln!("query failed: {e}"),
        }
    }
}
