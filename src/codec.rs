use std::fmt;
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to encode payload: {0}")]
    Encode(String),
    #[error("Failed to decode payload: {0}")]
    Decode(String),
}

/// Turns a job into the opaque bytes the queue stores, and back.
///
/// The queue never looks inside a payload, `decode(encode(job))` must give
/// back an equivalent job.
pub trait PayloadCodec: Send + Sync {
    type Job;

    fn encode(&self, job: &Self::Job) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Job, CodecError>;
}

/// JSON payloads through serde.
pub struct JsonCodec<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec")
            .field("job", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> PayloadCodec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    type Job = T;

    fn encode(&self, job: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(job).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct SendEmail {
        to: String,
        retries_left: u8,
    }

    #[test]
    fn json_codec_stores_plain_json() {
        let codec = JsonCodec::<SendEmail>::new();
        let bytes = codec
            .encode(&SendEmail {
                to: "a@example.com".into(),
                retries_left: 2,
            })
            .unwrap();

        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"{"to":"a@example.com","retries_left":2}"#
        );
        assert_eq!(
            codec.decode(&bytes).unwrap(),
            SendEmail {
                to: "a@example.com".into(),
                retries_left: 2,
            }
        );
    }

    #[test]
    fn json_codec_reports_garbage() {
        let codec = JsonCodec::<SendEmail>::new();
        let err = codec.decode(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
        assert!(err.to_string().starts_with("Failed to decode payload"));
    }
}
