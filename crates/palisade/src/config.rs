//! Proxy configuration: the read-only routing and login knobs.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// A backend server the proxy can route players to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Name used in the try list and by hooks.
    pub name: String,
    /// Address the backend-connection layer dials.
    pub address: SocketAddr,
}

/// How player info is forwarded to backend servers.
///
/// The login phase only cares whether forwarding is off: without
/// forwarding, backends cannot learn the authenticated UUID, so the
/// proxy resolves players to their deterministic offline id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardingMode {
    /// No forwarding; backends see players as offline.
    #[default]
    None,
    /// Forwarding via a handshake address payload.
    Legacy,
    /// Forwarding via a signed login plugin channel.
    Modern,
}

/// Configuration for the proxy. Read-only input to the login phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Packets at or above this size (bytes) are compressed once the
    /// client has negotiated compression. Negative disables compression
    /// entirely.
    pub compression_threshold: i32,

    /// Player-info forwarding mode.
    pub forwarding: ForwardingMode,

    /// All backend servers known to the proxy.
    pub servers: Vec<ServerInfo>,

    /// Server names, in order, that freshly connected players are routed
    /// to. Names not present in `servers` are skipped.
    pub try_order: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            compression_threshold: 256,
            forwarding: ForwardingMode::default(),
            servers: Vec::new(),
            try_order: Vec::new(),
        }
    }
}

impl ProxyConfig {
    /// Looks up a registered backend server by name.
    pub fn server(&self, name: &str) -> Option<&ServerInfo> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// Resolves the try list into concrete servers, preserving order.
    pub fn servers_to_try(&self) -> Vec<ServerInfo> {
        self.try_order
            .iter()
            .filter_map(|name| self.server(name).cloned())
            .collect()
    }
}
