//! Core protocol types for the login phase.
//!
//! Palisade sits between game clients and backend servers, so the proxy
//! speaks the client-facing protocol only up to the point where a login
//! completes and traffic is relayed. The types here cover exactly that
//! window: the packets a client may send or receive between connecting
//! and being handed to a backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ProtocolVersion
// ---------------------------------------------------------------------------

/// The protocol version negotiated for a client connection.
///
/// Protocol versions are totally ordered; feature availability is a
/// question of "at least version N". The two boundaries the login phase
/// cares about are exposed as constants with capability predicates so
/// callers never compare against raw numbers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u32);

impl ProtocolVersion {
    /// First version that understands compression negotiation.
    pub const COMPRESSION: ProtocolVersion = ProtocolVersion(47);

    /// First version that must explicitly acknowledge login success
    /// before entering the configuration phase.
    pub const LOGIN_ACK: ProtocolVersion = ProtocolVersion(764);

    /// Whether this version supports the [`SetCompression`] exchange.
    ///
    /// [`SetCompression`]: ClientboundPacket::SetCompression
    pub fn supports_compression(self) -> bool {
        self >= Self::COMPRESSION
    }

    /// Whether this version must confirm login success with a
    /// [`LoginAcknowledged`] packet before the next protocol phase.
    ///
    /// Older clients transition straight into the play phase.
    ///
    /// [`LoginAcknowledged`]: ServerboundPacket::LoginAcknowledged
    pub fn requires_login_ack(self) -> bool {
        self >= Self::LOGIN_ACK
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Profile data
// ---------------------------------------------------------------------------

/// An opaque property attached to a player profile (skin data, forwarded
/// metadata, and so on). The proxy preserves order and never interprets
/// the contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    /// Upstream signature over `value`, when the issuer provided one.
    pub signature: Option<String>,
}

/// Signed identity key material as it appears on the wire.
///
/// Verification of the signature itself happens upstream of the proxy's
/// login completion; by the time this reaches the session layer it is
/// treated as opaque key bytes plus expiry metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityKeyData {
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
    /// Expiry as milliseconds since the Unix epoch.
    pub expires_at: u64,
}

// ---------------------------------------------------------------------------
// Packets
// ---------------------------------------------------------------------------

/// Packets the proxy sends to a client during the login phase.
///
/// `#[serde(tag = "type")]` gives the internally tagged representation
/// (`{"type": "SetCompression", "threshold": 256}`), which keeps the wire
/// format self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientboundPacket {
    /// Announces the compression threshold. This must be the last packet
    /// written before the connection switches to compressed framing.
    SetCompression { threshold: i32 },

    /// Login has completed; the client is registered with the proxy.
    LoginSuccess {
        uuid: Uuid,
        username: String,
        properties: Vec<ProfileProperty>,
    },

    /// The client is being disconnected with a user-facing reason.
    Disconnect { reason: String },
}

/// Packets a client may send to the proxy during the login phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerboundPacket {
    /// Opens the login phase: who the client claims to be. The claim is
    /// verified by the proxy's credential layer before login completion
    /// begins.
    Hello {
        /// The protocol version negotiated for this connection.
        protocol: ProtocolVersion,
        username: String,
        uuid: Option<Uuid>,
        key: Option<IdentityKeyData>,
        /// The hostname the client addressed, when it sent one.
        virtual_host: Option<String>,
    },

    /// Confirms receipt of [`ClientboundPacket::LoginSuccess`]. Only
    /// valid while the proxy is waiting for exactly this confirmation;
    /// at any other time it is a protocol violation.
    LoginAcknowledged,

    /// Keep-alive echo. Not part of the login phase; a client sending
    /// this before login completion is violating the protocol.
    KeepAlive { id: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version_ordering_follows_numbers() {
        assert!(ProtocolVersion(100) < ProtocolVersion(200));
        assert!(ProtocolVersion::COMPRESSION < ProtocolVersion::LOGIN_ACK);
    }

    #[test]
    fn test_supports_compression_at_and_above_boundary() {
        assert!(!ProtocolVersion(46).supports_compression());
        assert!(ProtocolVersion::COMPRESSION.supports_compression());
        assert!(ProtocolVersion(765).supports_compression());
    }

    #[test]
    fn test_requires_login_ack_at_and_above_boundary() {
        assert!(!ProtocolVersion(763).requires_login_ack());
        assert!(ProtocolVersion::LOGIN_ACK.requires_login_ack());
        assert!(ProtocolVersion(800).requires_login_ack());
    }

    #[test]
    fn test_protocol_version_serde_transparent() {
        let json = serde_json::to_string(&ProtocolVersion(764)).unwrap();
        assert_eq!(json, "764");
        let back: ProtocolVersion = serde_json::from_str("47").unwrap();
        assert_eq!(back, ProtocolVersion::COMPRESSION);
    }

    #[test]
    fn test_clientbound_packet_tagged_representation() {
        let packet = ClientboundPacket::SetCompression { threshold: 256 };
        let json = serde_json::to_string(&packet).unwrap();
        assert!(json.contains(r#""type":"SetCompression""#), "got {json}");
    }

    #[test]
    fn test_login_success_preserves_property_order() {
        let packet = ClientboundPacket::LoginSuccess {
            uuid: Uuid::nil(),
            username: "steve".into(),
            properties: vec![
                ProfileProperty {
                    name: "textures".into(),
                    value: "a".into(),
                    signature: None,
                },
                ProfileProperty {
                    name: "origin".into(),
                    value: "b".into(),
                    signature: Some("sig".into()),
                },
            ],
        };
        let bytes = serde_json::to_vec(&packet).unwrap();
        let back: ClientboundPacket = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(packet, back);
    }

    #[test]
    fn test_serverbound_hello_roundtrip_with_key() {
        let packet = ServerboundPacket::Hello {
            protocol: ProtocolVersion::LOGIN_ACK,
            username: "alex".into(),
            uuid: Some(Uuid::from_u128(7)),
            key: Some(IdentityKeyData {
                public_key: vec![1, 2, 3],
                signature: vec![4, 5],
                expires_at: 1_700_000_000_000,
            }),
            virtual_host: Some("play.example.net".into()),
        };
        let bytes = serde_json::to_vec(&packet).unwrap();
        let back: ServerboundPacket = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(packet, back);
    }
}
