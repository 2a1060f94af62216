//! Pure key derivation: maps (namespace, metric key, granularity, timestamp)
//! to the Redis hash that holds the bucket and the field inside it.
//!
//! Everything in this module is side-effect free and infallible; callers are
//! expected to have already checked that the granularity is supported.

use crate::granularity::Granularity;

/// Delimiter joining the components of a shard key. Must not appear in
/// namespaces or metric keys.
pub const KEY_DELIMITER: char = ':';

/// Round `t` down to a multiple of `precision` seconds.
pub fn round_time(precision: i64, t: i64) -> i64 {
    (t / precision) * precision
}

/// Where a single bucket lives in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardLocation {
    /// The hash holding all buckets of one rotation window.
    pub shard_key: String,
    /// Hash field: the bucket's start timestamp.
    pub field: i64,
    /// When the whole shard should be dropped by the store. Double the
    /// retention window past the shard start, so a shard stays queryable
    /// for a full extra cycle after its nominal window closes.
    pub expires_at: i64,
}

/// Derive the shard key and bucket field for a timestamp.
///
/// The shard key is `namespace:key:granularity:shard_ts` where `shard_ts`
/// is `t` rounded down to the granularity's retention window, and the field
/// is `t` rounded down to the bucket duration.
pub fn derive_location(
    namespace: &str,
    key: &str,
    gran_name: &str,
    gran: Granularity,
    t: i64,
) -> ShardLocation {
    let field = round_time(gran.duration, t);
    let shard_ts = round_time(gran.ttl, t);

    let mut shard_key = String::with_capacity(
        namespace.len() + key.len() + gran_name.len() + 24,
    );
    shard_key.push_str(namespace);
    shard_key.push(KEY_DELIMITER);
    shard_key.push_str(key);
    shard_key.push(KEY_DELIMITER);
    shard_key.push_str(gran_name);
    shard_key.push(KEY_DELIMITER);
    shard_key.push_str(&shard_ts.to_string());

    ShardLocation {
        shard_key,
        field,
        expires_at: shard_ts + 2 * gran.ttl,
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::granularity::{days, hours, Granularity};

    #[test]
    fn rounds_down_to_precision() {
        assert_eq!(round_time(60, 119), 60);
        assert_eq!(round_time(60, 120), 120);
        assert_eq!(round_time(3600, 7199), 3600);
        assert_eq!(round_time(1, 42), 42);
    }

    #[test]
    fn derives_shard_key_and_field() {
        let gran = Granularity::new(hours(1), days(7));
        // 2021-01-01T13:37:00Z
        let t = 1_609_508_220;
        let loc = derive_location("stats", "messages", "1hour", gran, t);

        assert_eq!(loc.field, round_time(3600, t));
        let shard_ts = round_time(days(7), t);
        assert_eq!(
            loc.shard_key,
            format!("stats:messages:1hour:{shard_ts}")
        );
        assert_eq!(loc.expires_at, shard_ts + 2 * days(7));
    }

    #[test]
    fn timestamps_in_one_bucket_share_a_field() {
        let gran = Granularity::new(60, 3600);
        let a = derive_location("stats", "k", "1minute", gran, 1_000_020);
        let b = derive_location("stats", "k", "1minute", gran, 1_000_050);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_retention_windows_get_distinct_shards() {
        let gran = Granularity::new(60, 3600);
        let a = derive_location("stats", "k", "1minute", gran, 0);
        let b = derive_location("stats", "k", "1minute", gran, 3600);
        assert_ne!(a.shard_key, b.shard_key);
    }
}
