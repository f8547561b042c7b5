//! `ProxyServer` builder and accept loop.
//!
//! This is the entry point for running a Palisade proxy. It ties the
//! layers together: transport → protocol → session → login completion.

use std::sync::Arc;

use palisade_protocol::{Codec, JsonCodec};
use palisade_session::{Authenticator, SessionRegistry};
use palisade_transport::{Transport, WebSocketTransport};

use crate::ProxyError;
use crate::backend::BackendConnector;
use crate::config::ProxyConfig;
use crate::handler::handle_connection;
use crate::hooks::LoginHooks;

/// Shared proxy state passed to each connection handler task.
pub(crate) struct ProxyState<A, H, B, C> {
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) config: Arc<ProxyConfig>,
    pub(crate) auth: A,
    pub(crate) hooks: Arc<H>,
    pub(crate) backend: Arc<B>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a proxy.
///
/// # Example
///
/// ```rust,ignore
/// use palisade::prelude::*;
///
/// let (connector, requests) = ChannelConnector::new();
/// let server = ProxyServer::builder()
///     .bind("0.0.0.0:25577")
///     .config(my_config)
///     .build(OfflineAuthenticator, NoopHooks, connector)
///     .await?;
/// server.run().await
/// ```
pub struct ProxyServerBuilder {
    bind_addr: String,
    config: ProxyConfig,
}

impl ProxyServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:25577".to_string(),
            config: ProxyConfig::default(),
        }
    }

    /// Sets the address to bind the proxy to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the proxy configuration.
    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds and binds the proxy with the given collaborators.
    ///
    /// Uses `JsonCodec` and the WebSocket transport as defaults.
    pub async fn build<A, H, B>(
        self,
        auth: A,
        hooks: H,
        backend: B,
    ) -> Result<ProxyServer<A, H, B, JsonCodec>, ProxyError>
    where
        A: Authenticator,
        H: LoginHooks,
        B: BackendConnector,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ProxyState {
            registry: Arc::new(SessionRegistry::new()),
            config: Arc::new(self.config),
            auth,
            hooks: Arc::new(hooks),
            backend: Arc::new(backend),
            codec: JsonCodec,
        });

        Ok(ProxyServer { transport, state })
    }
}

impl Default for ProxyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Palisade proxy.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ProxyServer<A, H, B, C> {
    transport: WebSocketTransport,
    state: Arc<ProxyState<A, H, B, C>>,
}

impl ProxyServer<(), (), (), ()> {
    /// Creates a new builder.
    pub fn builder() -> ProxyServerBuilder {
        ProxyServerBuilder::new()
    }
}

impl<A, H, B, C> ProxyServer<A, H, B, C>
where
    A: Authenticator,
    H: LoginHooks,
    B: BackendConnector,
    C: Codec + Clone,
{
    /// Returns the local address the proxy is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The proxy-wide session registry.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the accept loop: one handler task per client connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ProxyError> {
        tracing::info!("palisade proxy running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
