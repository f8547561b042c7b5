//! Credential verification seam, invoked before login completion.
//!
//! Palisade does not verify credentials itself — that belongs to the
//! deployment (a session service, a platform account API, a database of
//! allowed players). The proxy defines the [`Authenticator`] trait and
//! calls it once per connection, with the client's claimed login, before
//! the login-completion state machine takes over. Everything after that
//! point treats the returned [`VerifiedLogin`] as ground truth.

use uuid::Uuid;

use crate::{Identity, SessionError};

/// The outcome of credential verification.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    /// The verified identity the proxy should continue with.
    pub identity: Identity,
    /// Whether the credentials were independently verified. Several
    /// login-completion checks are only enforced strictly when this is
    /// set — most notably identity-key binding failures.
    pub online_mode: bool,
}

/// Verifies a client's claimed login and resolves it to an identity.
///
/// `Send + Sync + 'static` because one authenticator instance is shared
/// across every connection task for the lifetime of the proxy. The
/// returned future carries an explicit `Send` bound because it is
/// awaited inside spawned connection tasks.
pub trait Authenticator: Send + Sync + 'static {
    /// Verifies the claim from a client's opening packet.
    ///
    /// # Errors
    /// Returns [`SessionError::AuthFailed`] when the claim is rejected;
    /// the connection is closed without entering login completion.
    fn authenticate(
        &self,
        username: &str,
        claimed_uuid: Option<Uuid>,
    ) -> impl std::future::Future<Output = Result<VerifiedLogin, SessionError>> + Send;
}

/// Accepts any well-formed username and issues an offline identity.
///
/// The development default: no external verification, deterministic
/// UUIDs derived from the username, `online_mode` false. Production
/// deployments replace this with a real verifier.
pub struct OfflineAuthenticator;

impl Authenticator for OfflineAuthenticator {
    async fn authenticate(
        &self,
        username: &str,
        _claimed_uuid: Option<Uuid>,
    ) -> Result<VerifiedLogin, SessionError> {
        if !is_valid_username(username) {
            return Err(SessionError::AuthFailed(format!(
                "invalid username {username:?}"
            )));
        }
        Ok(VerifiedLogin {
            identity: Identity::offline(username),
            online_mode: false,
        })
    }
}

/// Usernames are 1–16 characters from `[A-Za-z0-9_]`.
fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 16
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline_player_uuid;

    #[tokio::test]
    async fn test_offline_authenticate_valid_username_returns_offline_identity() {
        let login = OfflineAuthenticator
            .authenticate("steve_7", None)
            .await
            .expect("should authenticate");
        assert!(!login.online_mode);
        assert_eq!(login.identity.username(), "steve_7");
        assert_eq!(login.identity.uuid(), offline_player_uuid("steve_7"));
    }

    #[tokio::test]
    async fn test_offline_authenticate_ignores_claimed_uuid() {
        let claimed = Uuid::from_u128(42);
        let login = OfflineAuthenticator
            .authenticate("steve", Some(claimed))
            .await
            .expect("should authenticate");
        assert_ne!(login.identity.uuid(), claimed);
    }

    #[tokio::test]
    async fn test_offline_authenticate_rejects_malformed_usernames() {
        for bad in ["", "has space", "way_too_long_username", "ünicode"] {
            let result = OfflineAuthenticator.authenticate(bad, None).await;
            assert!(
                matches!(result, Err(SessionError::AuthFailed(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
