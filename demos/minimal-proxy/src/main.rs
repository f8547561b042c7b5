//! A minimal Palisade proxy: offline authentication, no extensions, one
//! backend server. Backend connect requests are logged instead of
//! relayed, so the login flow can be exercised end to end with any
//! WebSocket client.

use palisade::prelude::*;

#[tokio::main]
async fn main() -> Result<(), ProxyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,palisade=debug".into()),
        )
        .init();

    let config = ProxyConfig {
        servers: vec![ServerInfo {
            name: "lobby".into(),
            address: "127.0.0.1:25565".parse().expect("valid lobby address"),
        }],
        try_order: vec!["lobby".into()],
        ..ProxyConfig::default()
    };

    let (connector, mut requests) = ChannelConnector::new();
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            tracing::info!(
                player = %request.player,
                server = %request.server.name,
                address = %request.server.address,
                "would connect player to backend"
            );
        }
    });

    let server = ProxyServer::builder()
        .bind("127.0.0.1:25577")
        .config(config)
        .build(OfflineAuthenticator, NoopHooks, connector)
        .await?;

    tracing::info!(addr = %server.local_addr().map(|a| a.to_string()).unwrap_or_default(), "proxy listening");
    server.run().await
}
