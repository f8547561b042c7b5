//! Unified error type for the Palisade proxy.

use palisade_protocol::ProtocolError;
use palisade_session::SessionError;
use palisade_transport::TransportError;

use crate::hooks::HookError;

/// Top-level error that wraps all crate-specific errors.
///
/// When embedding the `palisade` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid packet).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (authentication, admission).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An error escaping an extension hook.
    #[error(transparent)]
    Hook(#[from] HookError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AuthFailed("nope".into());
        let proxy_err: ProxyError = err.into();
        assert!(matches!(proxy_err, ProxyError::Session(_)));
        assert!(proxy_err.to_string().contains("nope"));
    }

    #[test]
    fn test_from_hook_error() {
        let err = HookError("plugin fell over".into());
        let proxy_err: ProxyError = err.into();
        assert!(matches!(proxy_err, ProxyError::Hook(_)));
        assert!(proxy_err.to_string().contains("plugin fell over"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidPacket("bad".into());
        let proxy_err: ProxyError = err.into();
        assert!(matches!(proxy_err, ProxyError::Protocol(_)));
    }
}
