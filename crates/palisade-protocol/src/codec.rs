//! Codec trait and implementations for packet (de)serialization.
//!
//! The proxy does not care how packets become bytes — it only needs
//! something implementing [`Codec`]. [`JsonCodec`] is the default and is
//! ideal during development because every frame is human-readable; a
//! compact binary codec can be slotted in without touching other layers.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts packets to and from raw bytes.
///
/// `Send + Sync + 'static` because a codec instance is shared by every
/// connection task for the lifetime of the proxy.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a packet into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be
    /// represented in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a packet.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// truncated, or do not match the expected packet shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by JSON via `serde_json`.
///
/// Behind the `json` feature flag (enabled by default).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientboundPacket, ServerboundPacket};

    #[test]
    fn test_encode_decode_roundtrip() {
        let codec = JsonCodec;
        let packet = ClientboundPacket::Disconnect {
            reason: "shutting down".into(),
        };
        let bytes = codec.encode(&packet).expect("encode");
        let back: ClientboundPacket = codec.decode(&bytes).expect("decode");
        assert_eq!(packet, back);
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let codec = JsonCodec;
        let result: Result<ServerboundPacket, _> = codec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_unknown_packet_type_returns_decode_error() {
        // A structurally valid frame whose tag names no known packet must
        // fail to decode; the connection layer treats that as an
        // unrecognized packet.
        let codec = JsonCodec;
        let result: Result<ServerboundPacket, _> =
            codec.decode(br#"{"type":"Teleport","x":1}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
