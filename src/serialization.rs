//! Payload encoding for cached values.
//!
//! Backends store strings. A [`ValueCodec`] turns typed values into those
//! strings and back, and reports a typed error when a stored payload does
//! not match the requested shape.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encoder/decoder pair for cache payloads.
pub trait ValueCodec: Send + Sync + 'static {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String>;

    fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T>;
}

/// JSON payloads, the format the cache entries are persisted in.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| Error::SerializationError(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T> {
        serde_json::from_str(payload).map_err(|e| {
            Error::DeserializationError(format!(
                "payload does not match {}: {}",
                std::any::type_name::<T>(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Page {
        items: Vec<String>,
        total: u32,
    }

    #[test]
    fn test_json_codec_encodes_plain_json() {
        let page = Page {
            items: vec!["rent".into()],
            total: 1,
        };
        let payload = JsonCodec.encode(&page).expect("Failed to encode");
        assert_eq!(payload, r#"{"items":["rent"],"total":1}"#);

        let back: Page = JsonCodec.decode(&payload).expect("Failed to decode");
        assert_eq!(back, page);
    }

    #[test]
    fn test_shape_mismatch_is_deserialization_error() {
        let err = JsonCodec
            .decode::<Page>(r#"{"unexpected":true}"#)
            .expect_err("should not decode");
        assert!(matches!(err, Error::DeserializationError(_)));
    }

    #[test]
    fn test_corrupted_payload_is_deserialization_error() {
        let err = JsonCodec.decode::<Page>("{not json").expect_err("should not decode");
        assert!(matches!(err, Error::DeserializationError(_)));
    }
}
