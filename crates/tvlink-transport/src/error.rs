/// Socket-level failures. The session layer treats all of them as a
/// lost link and reconnects.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint could not be reached or refused the WebSocket upgrade.
    #[error("connect to {url} failed: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer went away mid-operation.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// A frame could not be written.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// The read half failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The listener could not bind or accept.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// TLS setup for a `wss://` endpoint failed.
    #[error("tls setup failed: {0}")]
    Tls(String),
}
