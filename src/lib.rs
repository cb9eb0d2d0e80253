//! # ledger-cache
//!
//! Read-through query cache for a personal-finance backend.
//!
//! ## Features
//!
//! - **Deterministic keys:** Query parameters are canonicalized (object keys
//!   sorted) and hashed with SHA-256, so equal parameters always map to the
//!   same key regardless of field order
//! - **TTL storage:** Results are stored as JSON with a per-entry lifetime
//! - **Pattern invalidation:** Mutations purge a whole namespace with
//!   cursor-based SCAN followed by one bulk DEL
//! - **Fault routing:** Connection errors are logged and a refused
//!   connection terminates the client
//! - **Backend agnostic:** Redis for production, an in-memory store for tests
//!
//! ## Quick Start
//!
//! ```ignore
//! use ledger_cache::{
//!     backend::InMemoryBackend,
//!     finance::{BillQuery, ListParams, Resource},
//!     CacheExpander, CacheStrategy,
//! };
//!
//! let expander = CacheExpander::new(InMemoryBackend::new());
//! let query = BillQuery::bills("user-1", ListParams::page(0, 20));
//!
//! // Served from the repository on the first call, from the cache afterwards.
//! let page = expander.with(&query, &repository, CacheStrategy::Refresh).await?;
//!
//! // After creating or updating a bill:
//! expander.invalidate(&Resource::Bills.namespace("user-1")).await?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod builder;
pub mod canonical;
pub mod config;
pub mod connection;
pub mod error;
pub mod expander;
pub mod finance;
pub mod hash;
pub mod key;
pub mod observability;
pub mod query;
pub mod repository;
pub mod serialization;
pub mod service;
pub mod store;
pub mod strategy;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use builder::CacheOperationBuilder;
pub use canonical::DeterministicSerializer;
pub use config::CacheConfig;
pub use error::{AppError, Error, Result};
pub use expander::CacheExpander;
pub use hash::{HashKey, HashKeyGenerator};
pub use query::CacheQuery;
pub use repository::DataRepository;
pub use service::CacheService;
pub use store::CacheStore;
pub use strategy::CacheStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
