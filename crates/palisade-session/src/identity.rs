//! Player identity: the proxy's resolved view of who is connecting.

use std::fmt;

use palisade_protocol::ProfileProperty;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The resolved representation of a connecting player.
///
/// An `Identity` is a plain value: username, stable UUID, and an
/// order-preserving list of opaque profile properties. Extension hooks
/// may replace an identity wholesale up until the moment a player handle
/// is constructed from it; after that point the identity is fixed for
/// the life of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    username: String,
    uuid: Uuid,
    properties: Vec<ProfileProperty>,
}

impl Identity {
    /// Creates an identity from already-verified credentials.
    pub fn new(
        username: impl Into<String>,
        uuid: Uuid,
        properties: Vec<ProfileProperty>,
    ) -> Self {
        Self {
            username: username.into(),
            uuid,
            properties,
        }
    }

    /// Creates an offline identity: the UUID is derived deterministically
    /// from the username, so the same name always maps to the same id.
    pub fn offline(username: impl Into<String>) -> Self {
        let username = username.into();
        let uuid = offline_player_uuid(&username);
        Self {
            username,
            uuid,
            properties: Vec::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn properties(&self) -> &[ProfileProperty] {
        &self.properties
    }

    /// Returns a copy of this identity with different properties.
    /// Used by hooks that decorate a profile without changing who it is.
    pub fn with_properties(mut self, properties: Vec<ProfileProperty>) -> Self {
        self.properties = properties;
        self
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.uuid)
    }
}

/// Derives the deterministic UUID used for players whose identity was not
/// independently verified (offline mode, or player-info forwarding
/// disabled).
///
/// The derivation is a name-based (v3) UUID over `OfflinePlayer:{name}`,
/// so it is stable across restarts and across proxies, and cannot collide
/// with the random (v4) UUIDs issued for verified players.
pub fn offline_player_uuid(username: &str) -> Uuid {
    Uuid::new_v3(
        &Uuid::NAMESPACE_OID,
        format!("OfflinePlayer:{username}").as_bytes(),
    )
}
