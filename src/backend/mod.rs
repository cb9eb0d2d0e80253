//! Cache backend abstraction and implementations.
//!
//! A backend stores plain string values under string keys with a TTL and
//! supports cursor-based key scanning. Typed (de)serialization happens one
//! level up, in [`crate::store::CacheStore`].

use crate::error::Result;
use std::future::Future;
use std::time::Duration;

#[cfg(feature = "inmemory")]
pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use self::redis::{RedisBackend, RedisConfig};

/// One step of a cursor-based scan.
///
/// A `cursor` of `0` means the iteration is complete. Pages may be empty
/// while the cursor is non-zero, and keys may repeat across pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<String>,
}

impl ScanPage {
    pub fn new(cursor: u64, keys: Vec<String>) -> Self {
        ScanPage { cursor, keys }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == 0
    }
}

/// Key-value store used by the cache layer.
///
/// All operations may suspend on network I/O. Implementations must accept
/// overlapping calls from concurrent tasks.
pub trait CacheBackend: Send + Sync + 'static {
    /// Establish the connection. Calling it again while connected is a no-op.
    fn connect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection gracefully. No-op when already disconnected.
    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Tear the connection down without waiting for a graceful close.
    fn quit(&self) -> impl Future<Output = Result<()>> + Send;

    fn is_connected(&self) -> bool;

    /// Fetch a raw value. `Ok(None)` for absent or expired keys.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Store a raw value with an expiry, replacing any existing entry.
    fn set(&self, key: &str, value: String, ttl: Duration)
        -> impl Future<Output = Result<()>> + Send;

    /// Remove keys in one call. Missing keys are ignored.
    fn delete(&self, keys: &[String]) -> impl Future<Output = Result<()>> + Send;

    /// One scan step over keys matching a glob `pattern`.
    fn scan(&self, cursor: u64, pattern: &str) -> impl Future<Output = Result<ScanPage>> + Send;

    /// Check whether the backend answers requests.
    fn health_check(&self) -> impl Future<Output = Result<bool>> + Send;
}

/// Match `key` against a Redis-style glob pattern.
///
/// Supports `*`, `?`, character classes (`[abc]`, `[a-z]`, `[^a]`) and `\`
/// escapes. Matching is byte-wise, like the server's.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    match_bytes(pattern.as_bytes(), key.as_bytes())
}

fn match_bytes(pattern: &[u8], key: &[u8]) -> bool {
    let mut p = pattern;
    let mut s = key;
    // Pattern after the most recent `*` and the key position it is retried from.
    let mut star: Option<(&[u8], &[u8])> = None;

    loop {
        if let Some((&b'*', rest)) = p.split_first() {
            p = rest;
            star = Some((p, s));
            continue;
        }

        match s.split_first() {
            Some((&ch, rest)) => {
                if let Some(after) = match_token(p, ch) {
                    p = after;
                    s = rest;
                    continue;
                }
            }
            None if p.is_empty() => return true,
            None => {}
        }

        // Mismatch: let the last `*` absorb one more byte.
        match star {
            Some((star_p, star_s)) if !star_s.is_empty() => {
                let star_s = &star_s[1..];
                star = Some((star_p, star_s));
                p = star_p;
                s = star_s;
            }
            _ => return false,
        }
    }
}

/// Match `ch` against the single (non-`*`) token at the head of `p`.
/// Returns the pattern remainder on success.
fn match_token(p: &[u8], ch: u8) -> Option<&[u8]> {
    match p {
        [] => None,
        [b'?', rest @ ..] => Some(rest),
        [b'[', class @ ..] => {
            let (matched, rest) = match_class(class, ch);
            matched.then_some(rest)
        }
        [b'\\', escaped, rest @ ..] => (*escaped == ch).then_some(rest),
        [c, rest @ ..] => (*c == ch).then_some(rest),
    }
}

/// Match one byte against a class body (after `[`). Returns the result and
/// the pattern remainder after the closing `]`.
fn match_class(mut p: &[u8], ch: u8) -> (bool, &[u8]) {
    let negate = p.first() == Some(&b'^');
    if negate {
        p = &p[1..];
    }

    let mut matched = false;
    loop {
        match p {
            [] => break,
            [b']', rest @ ..] => {
                p = rest;
                break;
            }
            [b'\\', escaped, rest @ ..] => {
                matched |= *escaped == ch;
                p = rest;
            }
            [start, b'-', end, rest @ ..] if *end != b']' => {
                let (lo, hi) = if start <= end { (*start, *end) } else { (*end, *start) };
                matched |= (lo..=hi).contains(&ch);
                p = rest;
            }
            [single, rest @ ..] => {
                matched |= *single == ch;
                p = rest;
            }
        }
    }

    (matched != negate, p)
}
