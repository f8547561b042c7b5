//! Per-connection driver: credential preamble, packet loop, phase
//! dispatch.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Receive the client's Hello → verify credentials
//!   2. Spawn the connection's writer task (the ordered outbound queue)
//!   3. Run the login state machine's `activated()` chain
//!   4. Loop: receive packets → dispatch to the active phase handler
//!   5. On exit: tear down exactly once
//!
//! Because all of this happens on one task, every field of the login
//! state machine is naturally confined to the connection's own execution
//! context — hook resumptions included.

use std::sync::Arc;
use std::time::Duration;

use palisade_protocol::{ClientboundPacket, Codec, ServerboundPacket};
use palisade_session::{Authenticator, SignedIdentityKey};
use palisade_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ProxyError;
use crate::backend::BackendConnector;
use crate::connection::{ConnectionHandle, OutboundCommand};
use crate::hooks::LoginHooks;
use crate::login::{LoginContext, LoginSessionHandler, PhaseTransition};
use crate::player::Player;
use crate::server::ProxyState;

/// How long a freshly accepted connection may take to send its Hello.
const HELLO_TIMEOUT: Duration = Duration::from_secs(5);
/// Idle read timeout for an established connection.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Handles a single client connection from accept to close.
pub(crate) async fn handle_connection<A, H, B, C>(
    conn: WebSocketConnection,
    state: Arc<ProxyState<A, H, B, C>>,
) -> Result<(), ProxyError>
where
    A: Authenticator,
    H: LoginHooks,
    B: BackendConnector,
    C: Codec + Clone,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: opening claim ---
    let hello = match tokio::time::timeout(HELLO_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            tracing::debug!(%conn_id, "closed before hello");
            return Ok(());
        }
        Ok(Err(e)) => return Err(ProxyError::Transport(e)),
        Err(_) => {
            tracing::debug!(%conn_id, "timed out waiting for hello");
            let _ = conn.close().await;
            return Ok(());
        }
    };

    let packet: ServerboundPacket = match state.codec.decode(&hello) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "undecodable opening packet");
            let _ = conn.close().await;
            return Ok(());
        }
    };
    let (protocol, username, claimed_uuid, key_data, virtual_host) = match packet {
        ServerboundPacket::Hello {
            protocol,
            username,
            uuid,
            key,
            virtual_host,
        } => (protocol, username, uuid, key, virtual_host),
        other => {
            tracing::debug!(%conn_id, ?other, "first packet must be Hello");
            let _ = conn.close().await;
            return Ok(());
        }
    };

    // --- Step 2: credential verification, before login completion ---
    let verified = match state.auth.authenticate(&username, claimed_uuid).await {
        Ok(verified) => verified,
        Err(e) => {
            tracing::debug!(%conn_id, %username, error = %e, "rejected login claim");
            let packet = ClientboundPacket::Disconnect {
                reason: e.to_string(),
            };
            if let Ok(bytes) = state.codec.encode(&packet) {
                let _ = conn.send(&bytes).await;
            }
            let _ = conn.close().await;
            return Ok(());
        }
    };
    let key = key_data.map(|data| Arc::new(SignedIdentityKey::from_wire(data)));

    // --- Step 3: shared handle + writer task ---
    let (handle, commands) = ConnectionHandle::open(protocol);
    let conn = Arc::new(conn);
    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        commands,
        state.codec.clone(),
    ));

    // --- Step 4: login completion ---
    let context = LoginContext::new(
        verified.identity,
        verified.online_mode,
        key,
        virtual_host,
    );
    let mut login = LoginSessionHandler::new(
        handle.clone(),
        context,
        Arc::clone(&state.registry),
        Arc::clone(&state.config),
        Arc::clone(&state.hooks),
        Arc::clone(&state.backend),
    );
    let mut phase = login.activated().await;

    // --- Step 5: packet loop ---
    loop {
        if handle.is_closed() {
            break;
        }
        let data = match tokio::time::timeout(READ_TIMEOUT, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::debug!(%conn_id, "read timed out");
                break;
            }
        };

        let packet: ServerboundPacket = match state.codec.decode(&data) {
            Ok(packet) => packet,
            Err(e) => {
                if matches!(phase, PhaseTransition::Stay) {
                    // Unrecognized bytes during login: protocol violation.
                    tracing::debug!(%conn_id, error = %e, "unrecognized packet during login");
                    login.handle_unexpected();
                } else {
                    tracing::debug!(%conn_id, error = %e, "dropping undecodable packet");
                }
                continue;
            }
        };

        let transition = match &mut phase {
            PhaseTransition::Stay => match packet {
                ServerboundPacket::LoginAcknowledged => {
                    Some(login.handle_acknowledged().await)
                }
                other => {
                    tracing::debug!(%conn_id, ?other, "unexpected packet during login");
                    login.handle_unexpected();
                    None
                }
            },
            PhaseTransition::Config(handler) => {
                handler.handle(packet);
                None
            }
            PhaseTransition::Play(handler) => {
                handler.handle(packet);
                None
            }
        };
        if let Some(transition) = transition {
            if !matches!(transition, PhaseTransition::Stay) {
                phase = transition;
            }
        }
    }

    // --- Step 6: teardown, exactly once ---
    handle.close(false);
    login.disconnected().await;
    let _ = writer.await;
    Ok(())
}

/// Drains the connection's outbound command queue in order.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut commands: mpsc::UnboundedReceiver<OutboundCommand>,
    codec: C,
) {
    while let Some(command) = commands.recv().await {
        match command {
            OutboundCommand::Packet(packet) => match codec.encode(&packet) {
                Ok(bytes) => {
                    if let Err(e) = conn.send(&bytes).await {
                        tracing::debug!(error = %e, "outbound send failed");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode outbound packet");
                }
            },
            OutboundCommand::EnableCompression(threshold) => {
                // Everything enqueued before this point has been written
                // uncompressed.
                tracing::trace!(threshold, "outbound compression enabled");
            }
            OutboundCommand::Close { .. } => {
                // The graceful/hard distinction lives at the protocol
                // level (a Disconnect packet precedes a graceful close);
                // the transport close is the same either way.
                let _ = conn.close().await;
                break;
            }
        }
    }
}

/// Handler for the configuration phase, installed once a login is
/// acknowledged. The configuration exchange is owned by the backend the
/// player is being routed to; until that relay attaches, inbound
/// configuration traffic has nowhere to go.
pub struct ConfigSessionHandler {
    player: Arc<Player>,
}

impl ConfigSessionHandler {
    pub(crate) fn new(player: Arc<Player>) -> Self {
        Self { player }
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    pub(crate) fn handle(&mut self, packet: ServerboundPacket) {
        tracing::trace!(player = %self.player, ?packet, "dropping packet until backend relay attaches");
    }
}

/// Handler for the play phase, installed directly for clients below the
/// acknowledgement threshold.
pub struct PlaySessionHandler {
    player: Arc<Player>,
}

impl PlaySessionHandler {
    pub(crate) fn new(player: Arc<Player>) -> Self {
        Self { player }
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    pub(crate) fn handle(&mut self, packet: ServerboundPacket) {
        tracing::trace!(player = %self.player, ?packet, "dropping packet until backend relay attaches");
    }
}
