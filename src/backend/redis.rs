//! Redis cache backend implementation.

use super::{CacheBackend, ScanPage};
use crate::error::{Error, Result};
use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::{Client, RedisError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Keys the server examines per SCAN step (the `COUNT` hint).
pub const DEFAULT_SCAN_COUNT: usize = 100;

/// Configuration for the Redis backend.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String, // e.g., "redis://localhost:6379"
    pub scan_count: usize,
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
            scan_count: DEFAULT_SCAN_COUNT,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Redis backend over one multiplexed connection.
///
/// The [`ConnectionManager`] is a single shared handle: clones of it
/// pipeline requests over the same socket, so concurrent callers never
/// block each other. The handle is created by `connect` and dropped by
/// `disconnect`/`quit`; operations in between fail with
/// `Error::NotConnected`.
///
/// # Example
///
/// ```no_run
/// # use ledger_cache::backend::{RedisBackend, RedisConfig, CacheBackend};
/// # use ledger_cache::error::Result;
/// # use std::time::Duration;
/// # async fn example() -> Result<()> {
/// let backend = RedisBackend::new(RedisConfig::default());
/// backend.connect().await?;
/// backend.set("bills/u1/abc", "[]".to_string(), Duration::from_secs(60)).await?;
/// let value = backend.get("bills/u1/abc").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    config: RedisConfig,
    conn: Arc<RwLock<Option<ConnectionManager>>>,
    connected: Arc<AtomicBool>,
}

impl RedisBackend {
    /// Create a backend. No connection is opened until `connect`.
    pub fn new(config: RedisConfig) -> Self {
        RedisBackend {
            config,
            conn: Arc::new(RwLock::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create from a server URL with default settings.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(RedisConfig {
            url: url.into(),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    async fn handle(&self) -> Result<ConnectionManager> {
        self.conn.read().await.clone().ok_or(Error::NotConnected)
    }
}

/// Map a client error onto the crate's tagged variants.
pub(crate) fn classify(e: RedisError) -> Error {
    if e.is_connection_refusal() {
        Error::ConnectionRefused(e.to_string())
    } else if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
        Error::ConnectionError(e.to_string())
    } else {
        Error::BackendError(e.to_string())
    }
}

impl CacheBackend for RedisBackend {
    async fn connect(&self) -> Result<()> {
        let mut guard = self.conn.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let client = Client::open(self.config.url.as_str())
            .map_err(|e| Error::ConfigError(format!("Invalid Redis URL {}: {}", self.config.url, e)))?;

        // A single attempt, so a refusal surfaces as such instead of
        // being retried into a timeout.
        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(0)
            .set_connection_timeout(Some(self.config.connect_timeout));
        let manager = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(classify)?;

        *guard = Some(manager);
        self.connected.store(true, Ordering::Release);
        info!("✓ Redis backend connected to {}", self.config.url);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let Some(mut conn) = self.conn.write().await.take() else {
            return Ok(());
        };
        self.connected.store(false, Ordering::Release);

        // Let the server close its side; the reply is irrelevant.
        let _: std::result::Result<(), RedisError> =
            ::redis::cmd("QUIT").query_async(&mut conn).await;

        info!("Redis backend disconnected from {}", self.config.url);
        Ok(())
    }

    async fn quit(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        if self.conn.write().await.take().is_some() {
            warn!("⚠ Redis connection to {} dropped", self.config.url);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.handle().await?;

        let value: Option<String> = ::redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;

        match &value {
            Some(_) => debug!("✓ Redis GET {} -> HIT", key),
            None => debug!("✓ Redis GET {} -> MISS", key),
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.handle().await?;

        // PX keeps sub-second TTLs; zero would be rejected by the server.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let _: () = ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;

        debug!("✓ Redis SET {} (TTL: {:?})", key, ttl);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.handle().await?;

        let removed: u64 = ::redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;

        debug!("✓ Redis DEL {} keys ({} removed)", keys.len(), removed);
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str) -> Result<ScanPage> {
        let mut conn = self.handle().await?;

        let (next, keys): (u64, Vec<String>) = ::redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(self.config.scan_count)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;

        debug!(
            "✓ Redis SCAN {} MATCH {} -> {} keys, next cursor {}",
            cursor,
            pattern,
            keys.len(),
            next
        );
        Ok(ScanPage::new(next, keys))
    }

    async fn health_check(&self) -> Result<bool> {
        let Ok(mut conn) = self.handle().await else {
            return Ok(false);
        };

        let pong: std::result::Result<String, RedisError> =
            ::redis::cmd("PING").query_async(&mut conn).await;
        Ok(matches!(pong.as_deref(), Ok("PONG")))
    }
}
