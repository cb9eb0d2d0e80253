//! Metrics hooks and TTL policy.

use std::collections::HashMap;
use std::time::Duration;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Receives cache outcome events from the read-through layer.
///
/// All methods default to no-ops so implementors only override what they
/// record.
pub trait CacheMetrics: Send + Sync {
    fn record_hit(&self, _key: &str, _duration: Duration) {}

    fn record_miss(&self, _key: &str, _duration: Duration) {}

    fn record_error(&self, _key: &str, _error: &str) {}

    fn record_invalidation(&self, _pattern: &str, _keys: usize) {}
}

/// Metrics sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {}

/// How long cached query results live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtlPolicy {
    /// Same TTL for every namespace.
    Fixed(Duration),
    /// TTL chosen by the first namespace segment (`"bills"` for
    /// `"bills/user_1"`), falling back to `default`.
    PerResource {
        default: Duration,
        overrides: HashMap<String, Duration>,
    },
}

impl TtlPolicy {
    pub fn ttl_for(&self, namespace: &str) -> Duration {
        match self {
            TtlPolicy::Fixed(ttl) => *ttl,
            TtlPolicy::PerResource { default, overrides } => {
                let resource = namespace.split('/').next().unwrap_or(namespace);
                overrides.get(resource).copied().unwrap_or(*default)
            }
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        TtlPolicy::Fixed(DEFAULT_TTL)
    }
}
