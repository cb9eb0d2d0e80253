//! Source-of-truth access for cached queries.

use crate::error::Result;
use crate::query::CacheQuery;
use std::future::Future;

/// Reads query results from the system of record (the document store).
///
/// Implementations should report their failures as `Error::RepositoryError`.
pub trait DataRepository<Q: CacheQuery>: Send + Sync {
    /// Run `query` against the source. `Ok(None)` when nothing matches.
    fn fetch(&self, query: &Q) -> impl Future<Output = Result<Option<Q::Output>>> + Send;
}
