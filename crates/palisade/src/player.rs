//! The finalized player session object.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use palisade_protocol::{ClientboundPacket, ProfileProperty};
use palisade_session::{Identity, SessionId, SessionRegistry, SignedIdentityKey};
use uuid::Uuid;

use crate::config::ServerInfo;
use crate::connection::ConnectionHandle;
use crate::permissions::PermissionChecker;

/// A connected player: the session object created once per successful
/// handshake and handed to later protocol phases.
///
/// The identity is fixed at construction — hook overrides happen before
/// a `Player` exists. The permission checker is installed at most once
/// during login; until then (and if installation never happens) all
/// permission queries are denied, matching the default checker.
pub struct Player {
    identity: Identity,
    key: Option<Arc<SignedIdentityKey>>,
    connection: ConnectionHandle,
    online_mode: bool,
    virtual_host: Option<String>,
    permissions: OnceLock<Arc<dyn PermissionChecker>>,
    servers_to_try: Vec<ServerInfo>,
    registration: OnceLock<SessionId>,
    torn_down: AtomicBool,
}

impl Player {
    pub(crate) fn new(
        identity: Identity,
        key: Option<Arc<SignedIdentityKey>>,
        connection: ConnectionHandle,
        online_mode: bool,
        virtual_host: Option<String>,
        servers_to_try: Vec<ServerInfo>,
    ) -> Self {
        Self {
            identity,
            key,
            connection,
            online_mode,
            virtual_host,
            permissions: OnceLock::new(),
            servers_to_try,
            registration: OnceLock::new(),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn username(&self) -> &str {
        self.identity.username()
    }

    pub fn uuid(&self) -> Uuid {
        self.identity.uuid()
    }

    pub fn properties(&self) -> &[ProfileProperty] {
        self.identity.properties()
    }

    /// The signed identity key presented at login, if any.
    pub fn identity_key(&self) -> Option<&Arc<SignedIdentityKey>> {
        self.key.as_ref()
    }

    pub fn online_mode(&self) -> bool {
        self.online_mode
    }

    /// The virtual host the client addressed, if it sent one.
    pub fn virtual_host(&self) -> Option<&str> {
        self.virtual_host.as_deref()
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    /// Whether this player holds `permission`. Denied until a checker is
    /// installed.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .get()
            .is_some_and(|checker| checker.has_permission(permission))
    }

    /// Installs the permission checker. Only the first installation
    /// takes effect.
    pub(crate) fn set_permission_checker(&self, checker: Arc<dyn PermissionChecker>) {
        let _ = self.permissions.set(checker);
    }

    /// The proxy's own first choice of backend for this player, from the
    /// routing configuration captured at construction.
    pub fn next_server_to_try(&self) -> Option<ServerInfo> {
        self.servers_to_try.first().cloned()
    }

    /// Gracefully disconnects the player with a user-facing reason.
    pub fn disconnect(&self, reason: &str) {
        self.connection.write(ClientboundPacket::Disconnect {
            reason: reason.to_string(),
        });
        self.connection.close(true);
        tracing::info!(player = %self, %reason, "player disconnected");
    }

    pub(crate) fn mark_registered(&self, id: SessionId) {
        let _ = self.registration.set(id);
    }

    pub(crate) fn registration(&self) -> Option<SessionId> {
        self.registration.get().copied()
    }

    /// Releases this player's hold on proxy-wide state. Idempotent, and
    /// safe regardless of how far login progressed: an unregistered
    /// player simply has nothing to release.
    pub(crate) fn teardown(&self, registry: &SessionRegistry) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(id) = self.registration.get() {
            registry.unregister(&self.identity, *id);
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::OutboundCommand;
    use palisade_protocol::ProtocolVersion;

    fn player() -> (
        Player,
        tokio::sync::mpsc::UnboundedReceiver<OutboundCommand>,
    ) {
        let (conn, rx) = ConnectionHandle::open(ProtocolVersion::LOGIN_ACK);
        let player = Player::new(
            Identity::offline("steve"),
            None,
            conn,
            false,
            None,
            Vec::new(),
        );
        (player, rx)
    }

    struct AllowAll;
    impl PermissionChecker for AllowAll {
        fn has_permission(&self, _permission: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_has_permission_denied_before_checker_installed() {
        let (player, _rx) = player();
        assert!(!player.has_permission("proxy.admin"));
    }

    #[test]
    fn test_set_permission_checker_only_first_install_wins() {
        let (player, _rx) = player();

        player.set_permission_checker(Arc::new(AllowAll));
        assert!(player.has_permission("proxy.admin"));

        // A second install must not replace the first.
        player.set_permission_checker(Arc::new(crate::permissions::DefaultPermissionChecker));
        assert!(player.has_permission("proxy.admin"));
    }

    #[test]
    fn test_disconnect_writes_reason_then_closes_gracefully() {
        let (player, mut rx) = player();

        player.disconnect("maintenance");

        assert_eq!(
            rx.try_recv().expect("packet"),
            OutboundCommand::Packet(ClientboundPacket::Disconnect {
                reason: "maintenance".into()
            })
        );
        assert_eq!(
            rx.try_recv().expect("close"),
            OutboundCommand::Close { notify: true }
        );
    }

    #[test]
    fn test_teardown_unregisters_once() {
        let (player, _rx) = player();
        let registry = SessionRegistry::new();
        let id = registry.register(player.identity()).expect("register");
        player.mark_registered(id);

        player.teardown(&registry);
        player.teardown(&registry);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_teardown_without_registration_is_safe() {
        let (player, _rx) = player();
        let registry = SessionRegistry::new();
        player.teardown(&registry);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_teardown_does_not_evict_newer_registration() {
        let (player, _rx) = player();
        let registry = SessionRegistry::new();
        let id = registry.register(player.identity()).expect("register");
        player.mark_registered(id);
        registry.unregister(player.identity(), id);
        let _newer = registry.register(player.identity()).expect("re-register");

        // Late teardown of the old session holds a stale id.
        player.teardown(&registry);

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_next_server_to_try_uses_first_configured() {
        let (conn, _rx) = ConnectionHandle::open(ProtocolVersion::LOGIN_ACK);
        let servers = vec![
            ServerInfo {
                name: "lobby".into(),
                address: "127.0.0.1:30001".parse().expect("addr"),
            },
            ServerInfo {
                name: "game".into(),
                address: "127.0.0.1:30002".parse().expect("addr"),
            },
        ];
        let player = Player::new(
            Identity::offline("steve"),
            None,
            conn,
            false,
            None,
            servers,
        );

        assert_eq!(
            player.next_server_to_try().map(|s| s.name),
            Some("lobby".to_string())
        );
    }
}
