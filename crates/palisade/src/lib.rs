//! # Palisade
//!
//! An extensible game-protocol proxy. Palisade accepts client
//! connections, drives them through a hook-extensible login-completion
//! sequence, registers exactly one session per identity, and hands
//! players off to backend servers.
//!
//! The crate layers are:
//!
//! ```text
//! palisade            login completion, hooks, players, routing
//! palisade-session    identity, signed keys, the session registry
//! palisade-protocol   packets and codecs
//! palisade-transport  raw client transport (WebSocket)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use palisade::prelude::*;
//!
//! # async fn run() -> Result<(), ProxyError> {
//! let (connector, _requests) = ChannelConnector::new();
//! let server = ProxyServer::builder()
//!     .bind("0.0.0.0:25577")
//!     .build(OfflineAuthenticator, NoopHooks, connector)
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod connection;
mod error;
mod handler;
pub mod hooks;
pub mod login;
pub mod permissions;
pub mod player;
mod server;

pub use error::ProxyError;
pub use handler::{ConfigSessionHandler, PlaySessionHandler};
pub use server::{ProxyServer, ProxyServerBuilder};

/// The commonly needed surface, re-exported in one place.
pub mod prelude {
    pub use crate::ProxyError;
    pub use crate::backend::{BackendConnector, ChannelConnector, ConnectRequest};
    pub use crate::config::{ForwardingMode, ProxyConfig, ServerInfo};
    pub use crate::connection::{ConnectionHandle, ProtocolPhase};
    pub use crate::hooks::{
        DisconnectStatus, HookError, LoginDecision, LoginHooks, NoopHooks,
        ProfileDecision,
    };
    pub use crate::login::{LoginContext, LoginSessionHandler, LoginState};
    pub use crate::permissions::{
        DefaultPermissionChecker, PermissionChecker, PermissionsSetup,
    };
    pub use crate::player::Player;
    pub use crate::server::{ProxyServer, ProxyServerBuilder};
    pub use palisade_protocol::{
        ClientboundPacket, Codec, JsonCodec, ProfileProperty, ProtocolVersion,
        ServerboundPacket,
    };
    pub use palisade_session::{
        Authenticator, Identity, OfflineAuthenticator, SessionError,
        SessionRegistry, SignedIdentityKey, VerifiedLogin, offline_player_uuid,
    };
}
