//! Error types for the session layer.

/// Errors that can occur while resolving or registering a player session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Credential verification rejected the claimed login.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A live session already exists for this identity (same username,
    /// case-insensitive, or same UUID).
    #[error("{0} is already connected to this proxy")]
    AlreadyConnected(String),
}
