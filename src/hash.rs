//! Content-addressed cache keys.

use crate::canonical::{DeterministicSerializer, SerializeFn};
use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;

/// Lowercase hex SHA-256 digest of a canonical serialization (64 chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashKey(String);

impl HashKey {
    /// Length of every key in hex characters.
    pub const LEN: usize = 64;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static INSTANCE: OnceLock<HashKeyGenerator> = OnceLock::new();

/// Derives stable cache keys from arbitrary serializable inputs.
///
/// The canonicalization step is injected as a function so the hashing side
/// stays independent of how values are serialized.
#[derive(Debug, Clone, Copy)]
pub struct HashKeyGenerator {
    serialize: SerializeFn,
}

impl HashKeyGenerator {
    /// Build a standalone generator. Prefer [`HashKeyGenerator::shared`]
    /// outside of tests.
    pub fn new(serialize: SerializeFn) -> Self {
        HashKeyGenerator { serialize }
    }

    /// Process-wide instance.
    ///
    /// The first caller decides the serializer; later arguments are ignored
    /// and every call returns the same instance.
    pub fn shared(serialize: SerializeFn) -> &'static HashKeyGenerator {
        INSTANCE.get_or_init(|| HashKeyGenerator::new(serialize))
    }

    /// Process-wide instance backed by [`DeterministicSerializer`].
    pub fn global() -> &'static HashKeyGenerator {
        Self::shared(DeterministicSerializer::execute_value)
    }

    /// Hash `input`.
    ///
    /// Returns `Ok(None)` ("no key") when the serializer reports no value;
    /// the sentinel itself is never hashed.
    ///
    /// # Errors
    ///
    /// `Error::SerializationError` when `input` cannot be canonicalized.
    pub fn execute<T: Serialize + ?Sized>(&self, input: Option<&T>) -> Result<Option<HashKey>> {
        let value = input.map(serde_json::to_value).transpose()?;

        let Some(canonical) = (self.serialize)(value.as_ref())? else {
            return Ok(None);
        };

        let digest = Sha256::digest(canonical.as_str().as_bytes());
        Ok(Some(HashKey(hex::encode(digest))))
    }
}

impl Default for HashKeyGenerator {
    fn default() -> Self {
        HashKeyGenerator::new(DeterministicSerializer::execute_value)
    }
}
