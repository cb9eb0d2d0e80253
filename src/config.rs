//! Configuration Module
//!
//! Loads cache settings from environment variables.

use crate::observability::{TtlPolicy, DEFAULT_TTL};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_SCAN_COUNT: usize = 100;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Cache configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Lifetime of cached query results
    pub default_ttl: Duration,
    /// `COUNT` hint for each SCAN step during pattern invalidation
    pub scan_count: usize,
    /// Upper bound for the initial connect
    pub connect_timeout: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Redis server URL (default: `redis://127.0.0.1:6379`)
    /// - `CACHE_DEFAULT_TTL_SECS` - Default TTL in seconds (default: 300)
    /// - `CACHE_SCAN_COUNT` - Keys per SCAN step (default: 100)
    /// - `CACHE_CONNECT_TIMEOUT_SECS` - Connect timeout in seconds (default: 5)
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |name: &str| lookup(name).and_then(|v| parse::<u64>(&v));

        let defaults = Self::default();
        Self {
            redis_url: lookup("REDIS_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.redis_url),
            default_ttl: parsed("CACHE_DEFAULT_TTL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_ttl),
            scan_count: lookup("CACHE_SCAN_COUNT")
                .and_then(|v| parse::<usize>(&v))
                .filter(|count| *count > 0)
                .unwrap_or(defaults.scan_count),
            connect_timeout: parsed("CACHE_CONNECT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
        }
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::Fixed(self.default_ttl)
    }

    #[cfg(feature = "redis")]
    pub fn redis_config(&self) -> crate::backend::RedisConfig {
        crate::backend::RedisConfig {
            url: self.redis_url.clone(),
            scan_count: self.scan_count,
            connect_timeout: self.connect_timeout,
        }
    }
}

fn parse<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            default_ttl: DEFAULT_TTL,
            scan_count: DEFAULT_SCAN_COUNT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.scan_count, 100);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_from_empty_lookup() {
        let config = CacheConfig::from_lookup(|_| None);
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("REDIS_URL", "redis://cache:6380/2"),
            ("CACHE_DEFAULT_TTL_SECS", "60"),
            ("CACHE_SCAN_COUNT", " 500 "),
            ("CACHE_CONNECT_TIMEOUT_SECS", "1"),
        ]));

        assert_eq!(config.redis_url, "redis://cache:6380/2");
        assert_eq!(config.default_ttl, Duration::from_secs(60));
        assert_eq!(config.scan_count, 500);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.ttl_policy(), TtlPolicy::Fixed(Duration::from_secs(60)));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("REDIS_URL", "  "),
            ("CACHE_DEFAULT_TTL_SECS", "0"),
            ("CACHE_SCAN_COUNT", "many"),
            ("CACHE_CONNECT_TIMEOUT_SECS", "-3"),
        ]));
        assert_eq!(config, CacheConfig::default());
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_redis_config_from_cache_config() {
        let config = CacheConfig {
            scan_count: 42,
            ..Default::default()
        };
        let redis = config.redis_config();
        assert_eq!(redis.url, config.redis_url);
        assert_eq!(redis.scan_count, 42);
    }
}
