//! Granularities: named pairings of bucket width and retention horizon.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ─── Duration helpers ────────────────────────────────────────────

pub fn seconds(n: i64) -> i64 {
    n
}
pub fn minutes(n: i64) -> i64 {
    n * 60
}
pub fn hours(n: i64) -> i64 {
    n * 3_600
}
pub fn days(n: i64) -> i64 {
    n * 86_400
}

// ─── Granularity ─────────────────────────────────────────────────

/// One resolution level: buckets of `duration` seconds, retained for
/// `ttl` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Granularity {
    /// Bucket width in seconds.
    pub duration: i64,
    /// Retention horizon in seconds. Must be at least `duration`.
    pub ttl: i64,
}

impl Granularity {
    pub fn new(duration: i64, ttl: i64) -> Self {
        Self { duration, ttl }
    }

    /// How many buckets one retention window holds — the widest window
    /// a query may ask for.
    pub fn retained_buckets(&self) -> i64 {
        self.ttl / self.duration
    }
}

// ─── GranularityTable ────────────────────────────────────────────

/// Ordered, immutable name → [`Granularity`] map. Built once at
/// construction; every record operation fans out over all entries in
/// insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GranularityTable {
    entries: Vec<(String, Granularity)>,
}

impl GranularityTable {
    /// Build a table from `(name, granularity)` pairs, validating each
    /// entry. Fails on a non-positive duration, a retention shorter than
    /// one bucket, or a duplicate name.
    pub fn new<N, I>(entries: I) -> Result<Self, ConfigError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Granularity)>,
    {
        let mut table = Vec::new();
        for (name, gran) in entries {
            let name = name.into();
            if gran.duration <= 0 {
                return Err(ConfigError::NonPositiveDuration(name));
            }
            if gran.ttl < gran.duration {
                return Err(ConfigError::TtlTooShort(name));
            }
            if table.iter().any(|(n, _): &(String, _)| *n == name) {
                return Err(ConfigError::DuplicateGranularity(name));
            }
            table.push((name, gran));
        }
        Ok(Self { entries: table })
    }

    pub fn get(&self, name: &str) -> Option<Granularity> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, g)| *g)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Granularity)> {
        self.entries.iter().map(|(n, g)| (n.as_str(), *g))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for GranularityTable {
    /// The stock table: per-second counters kept for two hours, up through
    /// daily buckets kept for roughly two years.
    fn default() -> Self {
        Self::new([
            ("1second", Granularity::new(seconds(1), hours(2))),
            ("1minute", Granularity::new(minutes(1), days(2))),
            ("1hour", Granularity::new(hours(1), days(7))),
            ("1day", Granularity::new(days(1), days(730))),
        ])
        .expect("default granularity table is valid")
    }
}

// ─── Tests ───────────────────────────────────────────────────────
