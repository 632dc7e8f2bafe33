//! Transport abstraction layer for tvlink.
//!
//! Provides the [`Connector`], [`Transport`] and [`Connection`] traits that
//! abstract over how a WebSocket to a television is opened (dialed by the
//! controller, or accepted by a simulated device).
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`,
//!   with `native-tls` for the `wss://` endpoints some sets expose

use std::future::Future;

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    ClientConnection, ServerConnection, WebSocketConnection,
    WebSocketConnector, WebSocketTransport,
};

use std::fmt;

/// Process-unique tag for one socket, used in logs and by the simulator
/// to track open links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw counter value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw counter value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens outgoing connections to a remote endpoint.
///
/// Sessions are generic over this trait so the reconnect logic can be
/// driven by an in-memory connector in tests.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Dials `url` and completes the WebSocket handshake.
    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// Listening side, used by the simulated televisions.
pub trait Transport: Send + Sync + 'static {
    /// What each accepted socket looks like.
    type Connection: Connection;

    /// Parks until a peer completes the WebSocket upgrade.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single connection that can send and receive bytes.
///
/// Implementations must allow `send` to proceed while another task is
/// parked in `recv`.
pub trait Connection: Send + Sync + 'static {
    /// Writes one frame. UTF-8 payloads go out as text frames.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Reads the next data frame, skipping control frames.
    ///
    /// `Ok(None)` means the peer closed the socket cleanly.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Sends a close frame and shuts the write half.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// This socket's tag.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "living-room");
        map.insert(ConnectionId::new(2), "bedroom");
        assert_eq!(map[&ConnectionId::new(1)], "living-room");
    }
}
