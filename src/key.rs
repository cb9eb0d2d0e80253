//! Cache key composition.
//!
//! Keys have the shape `"{namespace}/{hash}"`. All entries of one namespace
//! can then be purged with the glob pattern `"{namespace}/*"`.

use crate::hash::HashKey;

/// Separator between namespace segments and the hash.
pub const SEPARATOR: char = '/';

/// Builds cache keys and invalidation patterns.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Full key for one cached query result.
    ///
    /// # Example
    ///
    /// ```
    /// use ledger_cache::key::CacheKeyBuilder;
    /// use ledger_cache::hash::HashKeyGenerator;
    ///
    /// let hash = HashKeyGenerator::global()
    ///     .execute(Some(&serde_json::json!({"page": 0})))
    ///     .unwrap()
    ///     .unwrap();
    /// let key = CacheKeyBuilder::build("bills/user_1", &hash);
    /// assert!(key.starts_with("bills/user_1/"));
    /// ```
    pub fn build(namespace: &str, hash: &HashKey) -> String {
        format!("{}{}{}", namespace.trim_end_matches(SEPARATOR), SEPARATOR, hash)
    }

    /// Join namespace segments, e.g. `["bills", "user_1"]` → `"bills/user_1"`.
    ///
    /// Each segment stays one level: a `/` inside it is written as `%2F` (and
    /// `%` as `%25`), so user `a/b` never lands under user `a`'s pattern.
    /// Empty segments are skipped.
    pub fn namespace<S: AsRef<str>>(segments: &[S]) -> String {
        segments
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.is_empty())
            .map(escape_segment)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Glob pattern matching every key under `namespace`.
    ///
    /// Glob metacharacters inside the namespace are escaped so a user id such
    /// as `a*b` only matches itself.
    pub fn pattern(namespace: &str) -> String {
        let mut out = String::with_capacity(namespace.len() + 2);
        for c in namespace.trim_end_matches(SEPARATOR).chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push(SEPARATOR);
        out.push('*');
        out
    }
}

fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            SEPARATOR => out.push_str("%2F"),
            _ => out.push(c),
        }
    }
    out
}
