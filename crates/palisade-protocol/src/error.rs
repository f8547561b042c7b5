//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed bytes, a truncated frame, or a
    /// packet type the proxy does not recognize.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The packet decoded cleanly but violates a protocol rule — for
    /// example a packet that is never valid in the current phase.
    #[error("invalid packet: {0}")]
    InvalidPacket(String),
}
