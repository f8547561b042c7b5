//! Extension hooks: the awaitable stages of login completion.
//!
//! Every stage of the login sequence where external code may inspect,
//! override, or veto a value is one method on [`LoginHooks`]. The proxy
//! awaits each hook and carries on with whatever it returned; hooks run
//! for as long as they like, and the state machine re-checks connection
//! liveness after every one.
//!
//! Decisions are explicit sum types — a stage either continues with a
//! (possibly overridden) value or vetoes with a reason. Hook *failures*
//! are a separate channel ([`HookError`]): the state machine logs and
//! swallows them, so a buggy extension degrades that one handshake
//! instead of crashing the connection task.
//!
//! Default method bodies pass every value through unchanged, so
//! [`NoopHooks`] is the zero-extension proxy and implementors override
//! only the stages they care about.

use std::future::Future;
use std::sync::Arc;

use palisade_session::Identity;

use crate::config::ServerInfo;
use crate::permissions::PermissionsSetup;
use crate::player::Player;

/// An error escaping an extension hook.
///
/// Carries a description of what went wrong inside the extension; the
/// proxy never inspects it beyond logging.
#[derive(Debug, thiserror::Error)]
#[error("hook failed: {0}")]
pub struct HookError(pub String);

/// Outcome of the profile-request stage: the identity and online-mode
/// decision to continue the handshake with.
#[derive(Debug, Clone)]
pub struct ProfileDecision {
    pub identity: Identity,
    pub online_mode: bool,
}

/// Outcome of the login stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginDecision {
    /// Let the login proceed.
    Allow,
    /// Reject the login; the player is disconnected with this
    /// explanation.
    Deny(String),
}

/// Why a player's session ended, as reported to the disconnect hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectStatus {
    /// The session had fully completed login before ending.
    Completed,
    /// The client went away before login completed.
    CancelledByUser,
    /// The client went away while the login stage was still running;
    /// the player was never registered.
    CancelledBeforeCompletion,
}

/// The extension points of the login sequence, in firing order.
///
/// Methods return explicit futures with a `Send` bound (rather than
/// plain `async fn`) because hook calls are awaited inside spawned
/// connection tasks and occasionally spawned themselves.
pub trait LoginHooks: Send + Sync + 'static {
    /// Fired once per connection before a player handle exists. May
    /// replace the identity wholesale or flip the online-mode decision.
    fn profile_request(
        &self,
        identity: Identity,
        online_mode: bool,
        _virtual_host: Option<String>,
    ) -> impl Future<Output = Result<ProfileDecision, HookError>> + Send {
        async move {
            Ok(ProfileDecision {
                identity,
                online_mode,
            })
        }
    }

    /// Fired after the player handle is constructed and admitted. The
    /// returned setup produces the permission checker to install.
    fn permissions_setup(
        &self,
        _player: Arc<Player>,
    ) -> impl Future<Output = Result<PermissionsSetup, HookError>> + Send {
        async move { Ok(PermissionsSetup::default()) }
    }

    /// Fired right before the player is registered. Returning
    /// [`LoginDecision::Deny`] disconnects the player with the given
    /// explanation.
    fn login(
        &self,
        _player: Arc<Player>,
    ) -> impl Future<Output = Result<LoginDecision, HookError>> + Send {
        async move { Ok(LoginDecision::Allow) }
    }

    /// Notification: the player is registered and login success has been
    /// confirmed for their protocol version.
    fn post_login(
        &self,
        _player: Arc<Player>,
    ) -> impl Future<Output = Result<(), HookError>> + Send {
        async move { Ok(()) }
    }

    /// Picks the backend server the player is first routed to.
    /// `candidate` is the proxy's own choice from its try list; return
    /// it unchanged, override it, or return `None` to leave the player
    /// without a server (they will be disconnected).
    fn choose_initial_server(
        &self,
        _player: Arc<Player>,
        candidate: Option<ServerInfo>,
    ) -> impl Future<Output = Result<Option<ServerInfo>, HookError>> + Send {
        async move { Ok(candidate) }
    }

    /// Notification: the player's session ended. Fired at most once per
    /// player; infallible by design (there is nobody left to veto).
    fn player_disconnected(
        &self,
        _player: Arc<Player>,
        _status: DisconnectStatus,
    ) -> impl Future<Output = ()> + Send {
        async move {}
    }
}

/// A [`LoginHooks`] implementation that extends nothing.
pub struct NoopHooks;

impl LoginHooks for NoopHooks {}
