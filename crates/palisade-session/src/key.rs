//! Signed identity keys and their one-time holder binding.

use std::sync::OnceLock;

use palisade_protocol::IdentityKeyData;
use uuid::Uuid;

/// An identity key presented by a client at login.
///
/// The cryptographic verification of the key itself happens before login
/// completion; this type's job is the *holder binding*: associating the
/// key with exactly one player UUID for the key's lifetime. Downstream
/// consumers (signed chat, signed commands) rely on that binding being
/// unique — a key that could be re-bound to a second player would let
/// signatures be replayed across identities.
///
/// Binding is a one-time, idempotent-or-fail operation: the first
/// successful [`bind_holder`](Self::bind_holder) wins, re-binding to the
/// same holder is a no-op success, and binding to a different holder
/// fails. The `OnceLock` makes this safe even if two login attempts race
/// on a shared key object.
#[derive(Debug)]
pub struct SignedIdentityKey {
    public_key: Vec<u8>,
    signature: Vec<u8>,
    expires_at: u64,
    holder: OnceLock<Uuid>,
}

impl SignedIdentityKey {
    /// Wraps key material received on the wire. The key starts unbound.
    pub fn from_wire(data: IdentityKeyData) -> Self {
        Self {
            public_key: data.public_key,
            signature: data.signature,
            expires_at: data.expires_at,
            holder: OnceLock::new(),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Expiry as milliseconds since the Unix epoch.
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// The UUID this key is bound to, if a binding has happened.
    pub fn holder(&self) -> Option<Uuid> {
        self.holder.get().copied()
    }

    /// Attempts to bind this key to `holder`.
    ///
    /// Returns `true` if the key is now bound to `holder` (either this
    /// call won the binding, or it was already bound to the same UUID),
    /// `false` if the key is already bound to a different UUID.
    pub fn bind_holder(&self, holder: Uuid) -> bool {
        self.holder.set(holder).is_ok() || self.holder.get() == Some(&holder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SignedIdentityKey {
        SignedIdentityKey::from_wire(IdentityKeyData {
            public_key: vec![1, 2, 3],
            signature: vec![9],
            expires_at: 0,
        })
    }

    #[test]
    fn test_bind_holder_unbound_succeeds() {
        let key = key();
        let holder = Uuid::from_u128(1);
        assert!(key.bind_holder(holder));
        assert_eq!(key.holder(), Some(holder));
    }

    #[test]
    fn test_bind_holder_same_uuid_is_idempotent() {
        let key = key();
        let holder = Uuid::from_u128(1);
        assert!(key.bind_holder(holder));
        assert!(key.bind_holder(holder));
        assert_eq!(key.holder(), Some(holder));
    }

    #[test]
    fn test_bind_holder_different_uuid_fails_and_keeps_first() {
        let key = key();
        let first = Uuid::from_u128(1);
        let second = Uuid::from_u128(2);
        assert!(key.bind_holder(first));
        assert!(!key.bind_holder(second));
        assert_eq!(key.holder(), Some(first), "first bind must win");
    }

    #[test]
    fn test_bind_holder_racing_threads_exactly_one_binding() {
        use std::sync::Arc;

        let key = Arc::new(key());
        let mut handles = Vec::new();
        for i in 0..8u128 {
            let key = Arc::clone(&key);
            handles.push(std::thread::spawn(move || {
                key.bind_holder(Uuid::from_u128(i))
            }));
        }
        let wins = handles
            .into_iter()
            .map(|h| h.join())
            .filter(|r| matches!(r, Ok(true)))
            .count();
        // Exactly one thread's UUID is the holder; only that bind (and
        // any duplicate of it) can have reported success.
        assert_eq!(wins, 1);
        assert!(key.holder().is_some());
    }
}
