//! `MsgPack` encoding for envelopes and payloads.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ActorError;

/// Encodes `value` as named-field `MsgPack`.
///
/// # Errors
///
/// Returns `ActorError::Codec` if serialization fails.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ActorError> {
    rmp_serde::to_vec_named(value).map_err(|e| ActorError::Codec(e.to_string()))
}

/// Decodes a `MsgPack` frame.
///
/// # Errors
///
/// Returns `ActorError::Codec` if the bytes do not decode as `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ActorError> {
    rmp_serde::from_slice(bytes).map_err(|e| ActorError::Codec(e.to_string()))
}
