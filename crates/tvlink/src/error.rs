//! Unified error type for tvlink.

use tvlink_protocol::ProtocolError;
use tvlink_session::SessionError;
use tvlink_transport::TransportError;

use crate::discovery::DiscoveryError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `tvlink` facade you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TvLinkError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unsupported command).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (connect, pairing, timeouts, shutdown).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A discovery error (probe failed, not a television).
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

impl TvLinkError {
    /// Returns `true` for errors a caller may reasonably retry later.
    ///
    /// Unsupported commands and rejected pairing are permanent until
    /// something changes on the caller's or the user's side.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Discovery(_) => true,
            Self::Protocol(_) => false,
            Self::Session(e) => matches!(
                e,
                SessionError::Connect { .. }
                    | SessionError::Timeout(_)
                    | SessionError::CommandTimeout { .. }
                    | SessionError::SessionClosed(_)
            ),
        }
    }
}
