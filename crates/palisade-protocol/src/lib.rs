//! Wire protocol for the Palisade proxy.
//!
//! This crate defines the messages exchanged with game clients during the
//! login phase, and how they are converted to and from bytes:
//!
//! - **Types** ([`ClientboundPacket`], [`ServerboundPacket`],
//!   [`ProtocolVersion`], [`ProfileProperty`]) — the structures that
//!   travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — the byte-level
//!   (de)serialization strategy.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding
//!   or decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the proxy's
//! session logic. It knows nothing about connections, registries, or
//! backend servers — only message shapes.
//!
//! ```text
//! Transport (bytes) → Protocol (packets) → Proxy (login state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientboundPacket, IdentityKeyData, ProfileProperty, ProtocolVersion,
    ServerboundPacket,
};
