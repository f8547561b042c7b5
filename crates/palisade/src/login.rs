//! The login-completion state machine.
//!
//! This is the heart of the proxy: it takes a connection whose
//! credentials were already verified and drives it — through the
//! extension hooks — to a registered, routed player session. The
//! client-visible part is a three-state machine:
//!
//! ```text
//! Start ──LoginSuccess sent──► SuccessSent ──LoginAcknowledged──► Acknowledged
//! ```
//!
//! `LoginAcknowledged` is accepted in `SuccessSent` and nowhere else;
//! clients below
//! [`ProtocolVersion::LOGIN_ACK`](palisade_protocol::ProtocolVersion::LOGIN_ACK)
//! never send it, so the machine advances synthetically for them.
//!
//! Interleaved with that are five suspension points (the hook calls in
//! [`LoginHooks`]). Extension code may take unbounded time and the
//! client may vanish meanwhile, so liveness is re-polled immediately
//! after every resumption: a connection that closed mid-hook aborts the
//! handshake silently — that is a normal race, not an error. Everything
//! runs on the connection's own task, so no per-handshake state needs
//! locking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use palisade_protocol::ClientboundPacket;
use palisade_session::{
    Identity, SessionRegistry, SignedIdentityKey, offline_player_uuid,
};

use crate::backend::BackendConnector;
use crate::config::{ForwardingMode, ProxyConfig};
use crate::connection::{ConnectionHandle, ProtocolPhase};
use crate::handler::{ConfigSessionHandler, PlaySessionHandler};
use crate::hooks::{DisconnectStatus, HookError, LoginDecision, LoginHooks};
use crate::permissions::DefaultPermissionChecker;
use crate::player::Player;

/// User-facing disconnect reasons issued by the login phase.
pub mod messages {
    pub const ALREADY_CONNECTED: &str = "You are already connected to this proxy!";
    pub const INVALID_PLAYER_DATA: &str = "Invalid player data!";
    pub const INVALID_PUBLIC_KEY: &str = "Invalid player public key!";
    pub const NO_AVAILABLE_SERVERS: &str =
        "There are no available servers to connect you to. Try again later or contact an admin.";
}

/// Client-visible login progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// Nothing sent yet.
    Start,
    /// Login success is on the wire; waiting for the client to confirm.
    SuccessSent,
    /// Login is confirmed (explicitly or synthetically); the next
    /// protocol phase owns the connection.
    Acknowledged,
}

/// Login-phase-only connection state, predating the [`Player`].
///
/// Cleaned up unconditionally when the connection ends, no matter how
/// far the handshake got.
pub struct LoginContext {
    identity: Identity,
    online_mode: bool,
    key: Option<Arc<SignedIdentityKey>>,
    virtual_host: Option<String>,
    cleaned_up: AtomicBool,
}

impl LoginContext {
    pub fn new(
        identity: Identity,
        online_mode: bool,
        key: Option<Arc<SignedIdentityKey>>,
        virtual_host: Option<String>,
    ) -> Self {
        Self {
            identity,
            online_mode,
            key,
            virtual_host,
            cleaned_up: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn online_mode(&self) -> bool {
        self.online_mode
    }

    pub fn key(&self) -> Option<&Arc<SignedIdentityKey>> {
        self.key.as_ref()
    }

    pub fn virtual_host(&self) -> Option<&str> {
        self.virtual_host.as_deref()
    }

    /// Releases login-phase resources. Idempotent.
    pub fn cleanup(&self) {
        if !self.cleaned_up.swap(true, Ordering::SeqCst) {
            tracing::trace!(identity = %self.identity, "login context cleaned up");
        }
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }
}

/// Returned by the login handler when the connection should switch to
/// the next protocol phase; the driver applies it.
pub enum PhaseTransition {
    /// Keep the login handler active.
    Stay,
    /// Hand the connection to the configuration phase.
    Config(ConfigSessionHandler),
    /// Hand the connection to the play phase.
    Play(PlaySessionHandler),
}

/// Drives one connection through login completion.
///
/// Lives exactly as long as the connection's login phase: it is replaced
/// by the next-phase handler on success and dropped when the connection
/// ends.
pub struct LoginSessionHandler<H: LoginHooks, B: BackendConnector> {
    connection: ConnectionHandle,
    context: LoginContext,
    registry: Arc<SessionRegistry>,
    config: Arc<ProxyConfig>,
    hooks: Arc<H>,
    backend: Arc<B>,
    state: LoginState,
    player: Option<Arc<Player>>,
    /// Whether the identity key was still unbound when this handshake
    /// began. A failed bind after that means another session claimed the
    /// key mid-handshake (a replay), which is fatal under online mode.
    key_was_unbound: bool,
}

impl<H: LoginHooks, B: BackendConnector> LoginSessionHandler<H, B> {
    pub fn new(
        connection: ConnectionHandle,
        context: LoginContext,
        registry: Arc<SessionRegistry>,
        config: Arc<ProxyConfig>,
        hooks: Arc<H>,
        backend: Arc<B>,
    ) -> Self {
        let key_was_unbound = context
            .key()
            .is_some_and(|key| key.holder().is_none());
        Self {
            connection,
            context,
            registry,
            config,
            hooks,
            backend,
            state: LoginState::Start,
            player: None,
            key_was_unbound,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn player(&self) -> Option<&Arc<Player>> {
        self.player.as_ref()
    }

    /// Entry point, run once when the connection enters login
    /// completion. A hook failure anywhere in the chain is logged and
    /// swallowed; the connection is left in whatever state it reached.
    pub async fn activated(&mut self) -> PhaseTransition {
        let identity = self.context.identity().clone();
        match self.run_login_chain(identity.clone()).await {
            Ok(transition) => transition,
            Err(e) => {
                tracing::error!(%identity, error = %e, "login stage failed");
                PhaseTransition::Stay
            }
        }
    }

    async fn run_login_chain(
        &mut self,
        identity: Identity,
    ) -> Result<PhaseTransition, HookError> {
        let online_mode = self.context.online_mode();
        let virtual_host = self.context.virtual_host().map(str::to_owned);

        // Suspension point: extensions may override the identity or the
        // online-mode decision.
        let decision = self
            .hooks
            .profile_request(identity, online_mode, virtual_host)
            .await?;
        if self.connection.is_closed() {
            // The client went away while the hook ran.
            return Ok(PhaseTransition::Stay);
        }

        let player = Arc::new(Player::new(
            decision.identity,
            self.context.key().cloned(),
            self.connection.clone(),
            decision.online_mode,
            self.context.virtual_host().map(str::to_owned),
            self.config.servers_to_try(),
        ));
        self.player = Some(Arc::clone(&player));

        // Advisory admission check; the authoritative one happens at
        // registration time.
        if !self.registry.can_register(player.identity()) {
            player.disconnect(messages::ALREADY_CONNECTED);
            return Ok(PhaseTransition::Stay);
        }

        tracing::info!(player = %player, "player has connected");

        // Suspension point: permission providers pick a checker.
        let setup = self.hooks.permissions_setup(Arc::clone(&player)).await?;
        if self.connection.is_closed() {
            return Ok(PhaseTransition::Stay);
        }

        match setup.create_checker(&player) {
            Some(checker) => player.set_permission_checker(checker),
            None => {
                // A provider that cannot construct a checker is a bug in
                // that provider; never fail the connection over it.
                tracing::error!(
                    provider = setup.provider(),
                    player = %player,
                    "permission provider returned an unusable checker; \
                     falling back to the default"
                );
                player.set_permission_checker(Arc::new(DefaultPermissionChecker));
            }
        }

        self.start_login_completion(&player).await
    }

    async fn start_login_completion(
        &mut self,
        player: &Arc<Player>,
    ) -> Result<PhaseTransition, HookError> {
        let threshold = self.config.compression_threshold;
        if threshold >= 0 && self.connection.protocol_version().supports_compression() {
            // The announcement must be the last packet written
            // uncompressed; the threshold switch is queued right behind
            // it.
            self.connection
                .write(ClientboundPacket::SetCompression { threshold });
            self.connection.set_compression_threshold(threshold);
        }

        // Without player-info forwarding, backends see the deterministic
        // offline id; the key below must be bound against the same id.
        let canonical_uuid = if self.config.forwarding == ForwardingMode::None {
            offline_player_uuid(player.username())
        } else {
            player.uuid()
        };

        if let Some(key) = player.identity_key() {
            if self.key_was_unbound {
                if !key.bind_holder(canonical_uuid) {
                    if player.online_mode() {
                        self.disconnect_inbound(messages::INVALID_PUBLIC_KEY);
                        return Ok(PhaseTransition::Stay);
                    }
                    tracing::warn!(
                        player = %player,
                        "identity key could not be bound and will not verify"
                    );
                }
            } else if let Some(holder) = key.holder() {
                if holder != canonical_uuid {
                    tracing::warn!(
                        player = %player,
                        bound_to = %holder,
                        resolved = %canonical_uuid,
                        "identity key is bound to a different id; signed \
                         chat and commands will not verify for this player"
                    );
                }
            }
        }

        self.complete_login(player).await
    }

    async fn complete_login(
        &mut self,
        player: &Arc<Player>,
    ) -> Result<PhaseTransition, HookError> {
        self.connection.set_association(player.to_string());

        // Suspension point: the last chance for extensions to veto.
        let decision = self.hooks.login(Arc::clone(player)).await?;

        if self.connection.is_closed() {
            // Never registered, so no registry cleanup is owed — only
            // the notification.
            let hooks = Arc::clone(&self.hooks);
            let player = Arc::clone(player);
            tokio::spawn(async move {
                hooks
                    .player_disconnected(player, DisconnectStatus::CancelledBeforeCompletion)
                    .await;
            });
            return Ok(PhaseTransition::Stay);
        }

        if let LoginDecision::Deny(explanation) = decision {
            player.disconnect(&explanation);
            return Ok(PhaseTransition::Stay);
        }

        // Authoritative admission. The advisory check earlier can race
        // with a concurrent handshake; this one cannot.
        let registration = match self.registry.register(player.identity()) {
            Ok(id) => id,
            Err(_) => {
                player.disconnect(messages::ALREADY_CONNECTED);
                return Ok(PhaseTransition::Stay);
            }
        };
        player.mark_registered(registration);

        self.connection.write(ClientboundPacket::LoginSuccess {
            uuid: player.uuid(),
            username: player.username().to_owned(),
            properties: player.properties().to_vec(),
        });
        self.state = LoginState::SuccessSent;

        if !self.connection.protocol_version().requires_login_ack() {
            // Older clients never confirm; advance synthetically and go
            // straight to the play phase.
            self.state = LoginState::Acknowledged;
            self.connection.set_phase(ProtocolPhase::Play);
            self.run_post_login(player).await;
            return Ok(PhaseTransition::Play(PlaySessionHandler::new(Arc::clone(
                player,
            ))));
        }

        Ok(PhaseTransition::Stay)
    }

    /// Handles the client's login acknowledgement.
    pub async fn handle_acknowledged(&mut self) -> PhaseTransition {
        if self.state != LoginState::SuccessSent {
            // Out-of-order acknowledgement: protocol violation.
            self.disconnect_inbound(messages::INVALID_PLAYER_DATA);
            return PhaseTransition::Stay;
        }
        // SuccessSent is only ever entered with a player present.
        let Some(player) = self.player.clone() else {
            self.disconnect_inbound(messages::INVALID_PLAYER_DATA);
            return PhaseTransition::Stay;
        };

        self.state = LoginState::Acknowledged;
        self.connection.set_phase(ProtocolPhase::Config);
        self.run_post_login(&player).await;
        PhaseTransition::Config(ConfigSessionHandler::new(player))
    }

    /// Shared tail of both version branches: post-login notification and
    /// initial server selection.
    async fn run_post_login(&self, player: &Arc<Player>) {
        if let Err(e) = self.post_login_chain(player).await {
            tracing::error!(
                player = %player,
                error = %e,
                "failed to route player to an initial server"
            );
        }
    }

    async fn post_login_chain(&self, player: &Arc<Player>) -> Result<(), HookError> {
        self.hooks.post_login(Arc::clone(player)).await?;

        let candidate = player.next_server_to_try();
        let choice = self
            .hooks
            .choose_initial_server(Arc::clone(player), candidate)
            .await?;

        match choice {
            Some(server) => self.backend.request_connect(Arc::clone(player), server),
            None => player.disconnect(messages::NO_AVAILABLE_SERVERS),
        }
        Ok(())
    }

    /// Any packet not expected during login is a protocol violation:
    /// hard-close, no message.
    pub fn handle_unexpected(&self) {
        self.connection.close(false);
    }

    /// The connection ended, in whatever state. Safe to call more than
    /// once and safe when no player was ever created.
    pub async fn disconnected(&mut self) {
        if let Some(player) = self.player.take() {
            let was_registered = player.registration().is_some();
            player.teardown(&self.registry);
            if was_registered {
                let status = if self.state == LoginState::Acknowledged {
                    DisconnectStatus::Completed
                } else {
                    DisconnectStatus::CancelledByUser
                };
                self.hooks.player_disconnected(player, status).await;
            }
        }
        self.context.cleanup();
    }

    fn disconnect_inbound(&self, reason: &str) {
        self.connection.write(ClientboundPacket::Disconnect {
            reason: reason.to_string(),
        });
        self.connection.close(true);
    }
}
