//! Error types for the session layer.

use tvlink_protocol::{DeviceAddress, ProtocolError};

/// Errors that can occur while readying a session or running a command.
///
/// Transient socket trouble never shows up here on its own: the session
/// retries it internally. Callers only see it once their own deadline
/// runs out ([`Connect`](Self::Connect) / [`Timeout`](Self::Timeout)).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The socket could not be opened at all before the deadline.
    #[error("could not connect to {address}: {reason}")]
    Connect {
        address: DeviceAddress,
        reason: String,
    },

    /// The device rejected pairing or revoked the stored credential.
    ///
    /// The credential has already been cleared; the next attempt pairs
    /// from scratch.
    #[error("pairing with {address} was rejected: {reason}")]
    Auth {
        address: DeviceAddress,
        reason: String,
    },

    /// The command was written but no correlated response arrived in
    /// time. The session itself is still considered healthy.
    #[error("{command} on {address} got no response in time")]
    CommandTimeout {
        address: DeviceAddress,
        command: String,
    },

    /// The session was shut down (or its socket died) while the request
    /// was pending.
    #[error("session for {0} closed")]
    SessionClosed(DeviceAddress),

    /// The deadline elapsed while the session was still connecting or
    /// pairing.
    #[error("session for {0} did not become ready in time")]
    Timeout(DeviceAddress),

    /// No session is registered for the address.
    #[error("no session registered for {0}")]
    NotFound(DeviceAddress),

    /// The command could not be encoded (including commands outside the
    /// vendor's allow-list).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
