//! Player identity and session tracking for the Palisade proxy.
//!
//! This crate covers everything the proxy knows about *who* a connection
//! belongs to:
//!
//! 1. **Identity** — the resolved player profile ([`Identity`]), including
//!    deterministic offline identities ([`offline_player_uuid`])
//! 2. **Signed keys** — optional identity key material with a one-time
//!    holder binding ([`SignedIdentityKey`])
//! 3. **Credential verification** — the [`Authenticator`] seam invoked
//!    before login completion begins
//! 4. **Uniqueness** — the proxy-wide [`SessionRegistry`] enforcing at
//!    most one live session per identity
//!
//! # How it fits in the stack
//!
//! ```text
//! Proxy layer (above)   ← drives login completion, owns player handles
//!     ↕
//! Session layer (this crate)   ← identity, keys, registry
//!     ↕
//! Protocol layer (below)   ← provides ProfileProperty, key wire data
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod identity;
mod key;
mod registry;

pub use auth::{Authenticator, OfflineAuthenticator, VerifiedLogin};
pub use error::SessionError;
pub use identity::{Identity, offline_player_uuid};
pub use key::SignedIdentityKey;
pub use registry::{SessionId, SessionRegistry};
