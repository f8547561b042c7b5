//! The session registry: the proxy-wide map of live player sessions.
//!
//! This is the one piece of state genuinely shared between concurrently
//! running handshakes, and it enforces the proxy's core uniqueness rule:
//! at most one live session per identity. It offers two operations with
//! deliberately different strength:
//!
//! - [`can_register`](SessionRegistry::can_register) — **advisory**. A
//!   cheap early check so an obviously duplicate connection can be turned
//!   away before any expensive work. Its answer can go stale immediately.
//! - [`register`](SessionRegistry::register) — **authoritative**. The
//!   single source of truth; both lookups and the insert happen under one
//!   lock, so of two racing handshakes for the same identity exactly one
//!   succeeds.
//!
//! # Concurrency note
//!
//! A plain `HashMap` pair under one `std::sync::Mutex`. Critical sections
//! are a couple of map operations, so there is nothing to gain from a
//! concurrent map, and the single lock is what makes `register` the
//! linearization point for the uniqueness rule.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::{Identity, SessionError};

/// Opaque id for one successful registration.
///
/// Unregistration requires presenting the id back, so a handshake that
/// lost a duplicate race can never evict the session that won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

/// Proxy-wide registry of live sessions, keyed by identity.
///
/// Uniqueness is enforced on **both** the lowercased username and the
/// UUID: a conflict on either denies admission. (Two distinct accounts
/// sharing a display name must not coexist on the proxy any more than
/// two connections for the same account.)
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

struct Inner {
    by_name: HashMap<String, SessionId>,
    by_uuid: HashMap<Uuid, SessionId>,
    next_id: u64,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                by_name: HashMap::new(),
                by_uuid: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Advisory admission check: would `register` currently succeed?
    ///
    /// Races with concurrent registrations are expected; callers must
    /// still treat the later [`register`](Self::register) as the real
    /// decision.
    pub fn can_register(&self, identity: &Identity) -> bool {
        let inner = self.lock();
        !inner.by_name.contains_key(&name_key(identity))
            && !inner.by_uuid.contains_key(&identity.uuid())
    }

    /// Authoritative registration: atomically checks and inserts.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if a session with the
    /// same username (case-insensitive) or UUID is already live.
    pub fn register(&self, identity: &Identity) -> Result<SessionId, SessionError> {
        let mut inner = self.lock();
        let name = name_key(identity);
        if inner.by_name.contains_key(&name)
            || inner.by_uuid.contains_key(&identity.uuid())
        {
            return Err(SessionError::AlreadyConnected(
                identity.username().to_string(),
            ));
        }
        let id = SessionId(inner.next_id);
        inner.next_id += 1;
        inner.by_name.insert(name, id);
        inner.by_uuid.insert(identity.uuid(), id);
        tracing::debug!(identity = %identity, "session registered");
        Ok(id)
    }

    /// Removes a registration, but only if `id` still owns it.
    ///
    /// Safe to call with a stale id (the entry belongs to a newer
    /// session) or after the entry is already gone; both are no-ops, so
    /// teardown paths may call this unconditionally.
    pub fn unregister(&self, identity: &Identity, id: SessionId) {
        let mut inner = self.lock();
        let name = name_key(identity);
        if inner.by_name.get(&name) == Some(&id) {
            inner.by_name.remove(&name);
        }
        if inner.by_uuid.get(&identity.uuid()) == Some(&id) {
            inner.by_uuid.remove(&identity.uuid());
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().by_uuid.len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Username uniqueness is case-insensitive.
fn name_key(identity: &Identity) -> String {
    identity.username().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str, id: u128) -> Identity {
        Identity::new(name, Uuid::from_u128(id), Vec::new())
    }

    // =====================================================================
    // can_register() / register()
    // =====================================================================

    #[test]
    fn test_register_new_identity_succeeds() {
        let registry = SessionRegistry::new();
        let steve = ident("steve", 1);

        assert!(registry.can_register(&steve));
        registry.register(&steve).expect("should register");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_same_identity_twice_fails() {
        let registry = SessionRegistry::new();
        let steve = ident("steve", 1);
        registry.register(&steve).expect("first should succeed");

        let result = registry.register(&steve);

        assert!(
            matches!(result, Err(SessionError::AlreadyConnected(ref n)) if n == "steve")
        );
        assert_eq!(registry.len(), 1, "must not double-register");
    }

    #[test]
    fn test_register_conflicting_username_case_insensitive() {
        let registry = SessionRegistry::new();
        registry.register(&ident("Steve", 1)).expect("first");

        // Different UUID, same name modulo case: still a conflict.
        let result = registry.register(&ident("sTeVe", 2));
        assert!(matches!(result, Err(SessionError::AlreadyConnected(_))));
    }

    #[test]
    fn test_register_conflicting_uuid_different_name_fails() {
        let registry = SessionRegistry::new();
        registry.register(&ident("steve", 1)).expect("first");

        let result = registry.register(&ident("alex", 1));
        assert!(matches!(result, Err(SessionError::AlreadyConnected(_))));
    }

    #[test]
    fn test_can_register_reflects_registered_state() {
        let registry = SessionRegistry::new();
        let steve = ident("steve", 1);

        assert!(registry.can_register(&steve));
        registry.register(&steve).expect("register");
        assert!(!registry.can_register(&steve));
    }

    #[test]
    fn test_register_distinct_identities_both_succeed() {
        let registry = SessionRegistry::new();
        registry.register(&ident("steve", 1)).expect("steve");
        registry.register(&ident("alex", 2)).expect("alex");
        assert_eq!(registry.len(), 2);
    }

    // =====================================================================
    // unregister()
    // =====================================================================

    #[test]
    fn test_unregister_with_matching_id_removes_session() {
        let registry = SessionRegistry::new();
        let steve = ident("steve", 1);
        let id = registry.register(&steve).expect("register");

        registry.unregister(&steve, id);

        assert!(registry.is_empty());
        assert!(registry.can_register(&steve));
    }

    #[test]
    fn test_unregister_with_stale_id_is_a_noop() {
        // A handshake that lost the duplicate race holds a stale id; its
        // teardown must not evict the winner.
        let registry = SessionRegistry::new();
        let steve = ident("steve", 1);
        let winner = registry.register(&steve).expect("winner registers");
        registry.unregister(&steve, winner);
        let second = registry.register(&steve).expect("re-register");

        registry.unregister(&steve, winner); // stale

        assert_eq!(registry.len(), 1, "current session must survive");
        registry.unregister(&steve, second);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_twice_is_safe() {
        let registry = SessionRegistry::new();
        let steve = ident("steve", 1);
        let id = registry.register(&steve).expect("register");

        registry.unregister(&steve, id);
        registry.unregister(&steve, id);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_identity_is_safe() {
        let registry = SessionRegistry::new();
        let id = registry.register(&ident("steve", 1)).expect("register");
        registry.unregister(&ident("alex", 2), id);
        assert_eq!(registry.len(), 1);
    }

    // =====================================================================
    // Concurrency
    // =====================================================================

    #[test]
    fn test_register_concurrent_same_identity_exactly_one_wins() {
        use std::sync::Arc;

        let registry = Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                registry.register(&ident("steve", 1)).is_ok()
            }));
        }
        let wins = handles
            .into_iter()
            .map(|h| h.join())
            .filter(|r| matches!(r, Ok(true)))
            .count();

        assert_eq!(wins, 1, "registration must be exclusive");
        assert_eq!(registry.len(), 1);
    }
}
