//! Deterministic serialization of query parameters.
//!
//! Produces a canonical JSON string in which object keys are sorted and
//! array order is kept. Two values with the same key/value pairs therefore
//! serialize to identical bytes no matter how they were built.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Nesting limit for canonical output.
///
/// Reference cycles cannot reach this code through plain `Serialize` types
/// (serde's `rc` feature is not enabled), so runaway depth is the only
/// pathological shape left. It is rejected instead of recursing further.
pub const MAX_DEPTH: usize = 128;

/// Canonical string form of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerializedObject(String);

impl SerializedObject {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SerializedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<[u8]> for SerializedObject {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Signature of a canonicalization strategy over JSON values.
///
/// `Ok(None)` is the "no value" result for absent input.
pub type SerializeFn = fn(Option<&Value>) -> Result<Option<SerializedObject>>;

/// Key-order independent serializer.
///
/// # Example
///
/// ```
/// use ledger_cache::canonical::DeterministicSerializer;
/// use serde_json::json;
///
/// let a = DeterministicSerializer::execute(Some(&json!({"page": 0, "size": 10}))).unwrap();
/// let b = DeterministicSerializer::execute(Some(&json!({"size": 10, "page": 0}))).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.unwrap().as_str(), r#"{"page":0,"size":10}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicSerializer;

impl DeterministicSerializer {
    /// Canonicalize any serializable input.
    ///
    /// Returns `Ok(None)` when `input` is absent.
    ///
    /// # Errors
    ///
    /// `Error::SerializationError` when the value cannot be represented as JSON
    /// (for example a map with non-string keys) or nests deeper than
    /// [`MAX_DEPTH`].
    pub fn execute<T: Serialize + ?Sized>(input: Option<&T>) -> Result<Option<SerializedObject>> {
        match input {
            None => Ok(None),
            Some(value) => {
                let value = serde_json::to_value(value)?;
                Self::execute_value(Some(&value))
            }
        }
    }

    /// Canonicalize an already-built JSON value.
    pub fn execute_value(input: Option<&Value>) -> Result<Option<SerializedObject>> {
        let Some(value) = input else {
            return Ok(None);
        };

        let mut out = String::new();
        write_canonical(value, &mut out, 0)?;
        Ok(Some(SerializedObject(out)))
    }
}

fn write_canonical(value: &Value, out: &mut String, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::SerializationError(format!(
            "value nests deeper than {} levels (cyclic input is not supported)",
            MAX_DEPTH
        )));
    }

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Sort explicitly: the map may preserve insertion order if
            // serde_json's `preserve_order` feature is enabled elsewhere.
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out)?;
                out.push(':');
                write_canonical(item, out, depth + 1)?;
            }
            out.push('}');
        }
    }

    Ok(())
}

fn write_string(s: &str, out: &mut String) -> Result<()> {
    out.push_str(&serde_json::to_string(s)?);
    Ok(())
}
