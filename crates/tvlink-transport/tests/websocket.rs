//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and dial it with the connector, so data
//! flows over loopback the same way it does to a television.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use tvlink_transport::{
        Connection, Connector, Transport, TransportError, WebSocketConnector,
        WebSocketTransport,
    };

    /// Binds on a random port and returns the transport plus its `ws://` URL.
    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");
        (transport, format!("ws://{addr}"))
    }

    #[tokio::test]
    async fn test_connector_and_transport_exchange_text() {
        let (mut transport, url) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let client = WebSocketConnector::new()
            .connect(&url)
            .await
            .expect("client should connect");
        let server = server_handle.await.expect("task should complete");

        assert!(server.id().into_inner() > 0);
        assert_ne!(server.id(), client.id());

        client
            .send(br#"{"type":"register"}"#)
            .await
            .expect("send should succeed");
        let received = server
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"register"}"#);

        server
            .send(br#"{"type":"registered"}"#)
            .await
            .expect("send should succeed");
        let received = client
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"registered"}"#);

        client.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_peer_close() {
        let (mut transport, url) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let client = WebSocketConnector::new()
            .connect(&url)
            .await
            .expect("client should connect");
        let server = server_handle.await.unwrap();

        server.close().await.expect("close should succeed");

        let result = client.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_send_not_blocked_by_pending_recv() {
        let (mut transport, url) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let client = Arc::new(
            WebSocketConnector::new()
                .connect(&url)
                .await
                .expect("client should connect"),
        );
        let server = server_handle.await.unwrap();

        // Park a reader on the client; nothing arrives for it yet.
        let reader = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), client.send(b"KEY_VOLUP"))
            .await
            .expect("send must not wait for the reader")
            .expect("send should succeed");

        let received = server.recv().await.unwrap().unwrap();
        assert_eq!(received, b"KEY_VOLUP");

        server.send(b"ack").await.unwrap();
        let echoed = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(echoed, b"ack");
    }

    #[tokio::test]
    async fn test_connect_refused_returns_connect_failed() {
        // Bind then drop to get a port nobody listens on.
        let (transport, url) = bind().await;
        drop(transport);

        let result = WebSocketConnector::new().connect(&url).await;

        assert!(
            matches!(result, Err(TransportError::ConnectFailed { .. })),
            "dialing a closed port should fail to connect"
        );
    }
}
