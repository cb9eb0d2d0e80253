//! Typed cache store over a [`CacheBackend`].

use crate::backend::{CacheBackend, ScanPage};
use crate::connection::{ConnectionErrorHandler, ConnectionState};
use crate::error::{Error, Result};
use crate::serialization::{JsonCodec, ValueCodec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// Cache store used by the query layer.
///
/// Values pass through a [`ValueCodec`] (JSON by default). Connection errors
/// raised by any operation are routed through a [`ConnectionErrorHandler`]
/// before being returned to the caller; nothing except a miss is swallowed.
///
/// # Example
///
/// ```
/// # use ledger_cache::backend::InMemoryBackend;
/// # use ledger_cache::store::CacheStore;
/// # use std::time::Duration;
/// # async fn example() -> ledger_cache::Result<()> {
/// let store = CacheStore::new(InMemoryBackend::new());
/// store.connect().await?;
/// store.save("bills/u1/page0", &vec![1, 2, 3], Duration::from_secs(60)).await?;
/// let page: Option<Vec<i32>> = store.recover("bills/u1/page0").await?;
/// assert_eq!(page, Some(vec![1, 2, 3]));
/// # Ok(())
/// # }
/// ```
pub struct CacheStore<B: CacheBackend, C: ValueCodec = JsonCodec> {
    backend: B,
    codec: C,
    errors: ConnectionErrorHandler,
}

impl<B: CacheBackend> CacheStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_codec(backend, JsonCodec)
    }
}

impl<B: CacheBackend, C: ValueCodec> CacheStore<B, C> {
    pub fn with_codec(backend: B, codec: C) -> Self {
        CacheStore {
            backend,
            codec,
            errors: ConnectionErrorHandler::new(),
        }
    }

    /// Connect the backend. Idempotent.
    ///
    /// A failed initial connect is returned as is; it does not go through
    /// the error handler.
    pub async fn connect(&self) -> Result<()> {
        self.backend.connect().await?;
        self.errors.mark_connected();
        Ok(())
    }

    /// Close the connection gracefully. Safe to call when disconnected.
    pub async fn disconnect(&self) -> Result<()> {
        self.backend.disconnect().await
    }

    /// Drop the connection immediately.
    pub async fn quit(&self) -> Result<()> {
        self.backend.quit().await
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.errors.state()
    }

    /// Fetch and decode `key`. `Ok(None)` on a miss or an expired entry.
    ///
    /// # Errors
    ///
    /// - `Error::DeserializationError` if the payload does not match `T`
    /// - connection and backend errors from the store
    pub async fn recover<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let payload = self.route(self.backend.get(key).await).await?;
        payload.map(|p| self.codec.decode(&p)).transpose()
    }

    /// Encode and store `value` under `key` for `ttl`, replacing any entry.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError` for a zero TTL
    /// - `Error::SerializationError` if `value` cannot be encoded
    /// - connection and backend errors from the store
    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Err(Error::ValidationError(format!("TTL for {} must be positive", key)));
        }
        let payload = self.codec.encode(value)?;
        self.route(self.backend.set(key, payload, ttl).await).await
    }

    /// Remove one key. Removing a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.delete_many(&[key.to_string()]).await
    }

    /// Remove several keys in one backend call.
    pub async fn delete_many(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.route(self.backend.delete(keys).await).await
    }

    /// One step of a cursor scan. Callers loop until the cursor is `0`.
    pub async fn scan(&self, cursor: u64, pattern: &str) -> Result<ScanPage> {
        self.route(self.backend.scan(cursor, pattern).await).await
    }

    /// Delete every key matching `pattern`.
    ///
    /// Scans sequentially from cursor `0` until the store reports `0` again,
    /// then issues a single bulk delete of the de-duplicated keys. Nothing is
    /// deleted when no key matches. Keys written while the scan runs may be
    /// missed.
    ///
    /// Returns the number of keys submitted for deletion.
    pub async fn delete_with_pattern(&self, pattern: &str) -> Result<usize> {
        let mut cursor = 0;
        let mut seen = HashSet::new();
        let mut keys = Vec::new();

        loop {
            let page = self.scan(cursor, pattern).await?;
            for key in page.keys {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }

        if keys.is_empty() {
            debug!("Pattern {} matched no keys", pattern);
            return Ok(0);
        }

        self.delete_many(&keys).await?;
        info!("✓ Invalidated {} keys matching {}", keys.len(), pattern);
        Ok(keys.len())
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn route<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_connection_error() {
                self.errors.handle(e, &self.backend).await;
            }
        }
        result
    }
}
