//! In-memory cache backend.

use super::{glob_match, CacheBackend, ScanPage};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Keys examined per scan step unless overridden.
pub const DEFAULT_SCAN_COUNT: usize = 10;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
    /// Insertion sequence number; kept across overwrites, never reused.
    seq: u64,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local backend backed by a concurrent hash map.
///
/// Expired entries are dropped lazily when read or scanned.
///
/// `scan` visits keys in insertion order, `scan_count` at a time. The cursor
/// is the sequence number of the last key examined, so a key that exists
/// for the whole scan is returned even when other keys are added or removed
/// between pages. Like the real server it can return empty pages before the
/// cursor reaches `0`.
///
/// Clones share the same storage.
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, Entry>>,
    connected: Arc<AtomicBool>,
    next_seq: Arc<AtomicU64>,
    scan_count: usize,
}

impl InMemoryBackend {
    /// Create an empty, connected backend.
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
            connected: Arc::new(AtomicBool::new(true)),
            // 0 is the scan completion cursor.
            next_seq: Arc::new(AtomicU64::new(1)),
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    /// Number of keys examined per `scan` call.
    pub fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count.max(1);
        self
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.store.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear_all(&self) {
        self.store.clear();
        warn!("⚠ In-memory cache cleared");
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn connect(&self) -> Result<()> {
        if !self.connected.swap(true, Ordering::AcqRel) {
            info!("✓ In-memory cache connected");
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::AcqRel) {
            info!("In-memory cache disconnected");
        }
        Ok(())
    }

    async fn quit(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        warn!("⚠ In-memory cache quit");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_connected()?;
        let now = Instant::now();

        let expired = match self.store.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                debug!("✓ InMemory GET {} -> HIT", key);
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };

        // Guard dropped above; removing while holding it would deadlock.
        if expired {
            self.store.remove_if(key, |_, e| e.is_expired(now));
        }

        debug!("✓ InMemory GET {} -> MISS", key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.ensure_connected()?;

        let expires_at = Instant::now() + ttl;
        self.store
            .entry(key.to_string())
            .and_modify(|e| {
                e.value.clone_from(&value);
                e.expires_at = expires_at;
            })
            .or_insert_with(|| Entry {
                value: value.clone(),
                expires_at,
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            });

        debug!("✓ InMemory SET {} (TTL: {:?})", key, ttl);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        self.ensure_connected()?;

        for key in keys {
            self.store.remove(key);
        }

        debug!("✓ InMemory DELETE {} keys", keys.len());
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str) -> Result<ScanPage> {
        self.ensure_connected()?;
        let now = Instant::now();

        let mut pending: Vec<(u64, String)> = self
            .store
            .iter()
            .filter(|e| e.seq > cursor && !e.is_expired(now))
            .map(|e| (e.seq, e.key().clone()))
            .collect();
        pending.sort_unstable_by_key(|(seq, _)| *seq);

        let window = pending.len().min(self.scan_count);
        let keys: Vec<String> = pending[..window]
            .iter()
            .filter(|(_, k)| glob_match(pattern, k))
            .map(|(_, k)| k.clone())
            .collect();

        let next = match pending[..window].last() {
            Some((seq, _)) if window < pending.len() => *seq,
            _ => 0,
        };

        debug!(
            "✓ InMemory SCAN {} MATCH {} -> {} keys, next cursor {}",
            cursor,
            pattern,
            keys.len(),
            next
        );
        Ok(ScanPage::new(next, keys))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.is_connected())
    }
}
