//! Integration tests for the WebSocket transport.

use futures_util::{SinkExt, StreamExt};
use palisade_transport::{Connection, Transport, WebSocketTransport};
use tokio_tungstenite::tungstenite::Message;

async fn bound_transport() -> (WebSocketTransport, String) {
    let transport = WebSocketTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport
        .local_addr()
        .expect("should have local addr")
        .to_string();
    (transport, addr)
}

#[tokio::test]
async fn test_accept_assigns_distinct_ids() {
    let (mut transport, addr) = bound_transport().await;

    let url = format!("ws://{addr}");
    let client_a = tokio_tungstenite::connect_async(url.clone());
    let client_b = tokio_tungstenite::connect_async(url);

    let ((conn_a, conn_b), _clients) = tokio::join!(
        async {
            let a = transport.accept().await.expect("accept a");
            let b = transport.accept().await.expect("accept b");
            (a, b)
        },
        async {
            (
                client_a.await.expect("connect a"),
                client_b.await.expect("connect b"),
            )
        },
    );

    assert_ne!(conn_a.id(), conn_b.id());
}

#[tokio::test]
async fn test_send_and_recv_roundtrip() {
    let (mut transport, addr) = bound_transport().await;

    let connect = tokio_tungstenite::connect_async(format!("ws://{addr}"));
    let (conn, client) = tokio::join!(
        async { transport.accept().await.expect("accept") },
        async { connect.await.expect("connect").0 },
    );
    let (mut client_tx, mut client_rx) = client.split();

    conn.send(b"hello client").await.expect("send");
    let got = client_rx.next().await.expect("frame").expect("ok");
    assert_eq!(got.into_data().as_ref(), b"hello client");

    client_tx
        .send(Message::Binary(b"hello proxy".to_vec().into()))
        .await
        .expect("client send");
    let got = conn.recv().await.expect("recv").expect("some");
    assert_eq!(got, b"hello proxy");
}

#[tokio::test]
async fn test_recv_returns_none_after_client_close() {
    let (mut transport, addr) = bound_transport().await;

    let connect = tokio_tungstenite::connect_async(format!("ws://{addr}"));
    let (conn, mut client) = tokio::join!(
        async { transport.accept().await.expect("accept") },
        async { connect.await.expect("connect").0 },
    );

    client.close(None).await.expect("client close");

    assert!(conn.recv().await.expect("recv").is_none());
}

#[tokio::test]
async fn test_text_frames_are_delivered_as_bytes() {
    let (mut transport, addr) = bound_transport().await;

    let connect = tokio_tungstenite::connect_async(format!("ws://{addr}"));
    let (conn, mut client) = tokio::join!(
        async { transport.accept().await.expect("accept") },
        async { connect.await.expect("connect").0 },
    );

    client
        .send(Message::Text("{\"type\":\"LoginAcknowledged\"}".into()))
        .await
        .expect("send text");

    let got = conn.recv().await.expect("recv").expect("some");
    assert_eq!(got, b"{\"type\":\"LoginAcknowledged\"}");
}
