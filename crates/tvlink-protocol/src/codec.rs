//! Byte-level framing for adapter messages.
//!
//! Adapters build typed frames and hand them to a [`Codec`]; the session
//! only ever sees the resulting bytes. Both vendors speak JSON, so
//! [`JsonCodec`] is the only implementation.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns frame structs into socket payloads and socket payloads into
/// values the adapters can classify.
///
/// Adapters are owned by session tasks that hop between Tokio workers,
/// hence `Send + Sync + 'static`. Decoding produces owned values because
/// the read buffer is released as soon as the frame is classified.
pub trait Codec: Send + Sync + 'static {
    /// Serializes an outbound frame.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Parses an inbound payload.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] on malformed input or a shape mismatch.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// JSON framing, which both vendors use.
///
/// ## Example
///
/// ```rust
/// use tvlink_protocol::{Ack, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let ack = Ack::sent();
/// let bytes = codec.encode(&ack).unwrap();
/// assert_eq!(bytes, br#"{"ok":true}"#);
///
/// let decoded: Ack = codec.decode(&bytes).unwrap();
/// assert_eq!(ack, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
