//! Hand-off boundary to backend servers.
//!
//! The login phase ends by *requesting* a backend connection; actually
//! establishing it, relaying traffic, and retrying belong to the
//! backend-connection layer behind the [`BackendConnector`] trait.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::ServerInfo;
use crate::player::Player;

/// A request to connect a player to a backend server.
#[derive(Clone)]
pub struct ConnectRequest {
    pub player: Arc<Player>,
    pub server: ServerInfo,
}

/// Initiates backend connections for freshly logged-in players.
///
/// `request_connect` is fire-and-forget: it must not block the calling
/// connection task, and no outcome flows back through it.
pub trait BackendConnector: Send + Sync + 'static {
    fn request_connect(&self, player: Arc<Player>, server: ServerInfo);
}

/// A [`BackendConnector`] that queues requests on a channel for the
/// embedding application to consume.
pub struct ChannelConnector {
    sender: mpsc::UnboundedSender<ConnectRequest>,
}

impl ChannelConnector {
    /// Creates the connector and the stream of requests it produces.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl BackendConnector for ChannelConnector {
    fn request_connect(&self, player: Arc<Player>, server: ServerInfo) {
        tracing::debug!(player = %player, server = %server.name, "requesting backend connection");
        if self
            .sender
            .send(ConnectRequest { player, server })
            .is_err()
        {
            tracing::warn!("backend connect queue is closed; dropping request");
        }
    }
}
