//! Error types for the protocol layer.
//!
//! Each tvlink crate defines its own error enum. When you see a
//! `ProtocolError`, the problem is in building or classifying a vendor
//! frame, not in networking or pairing state.

use crate::VendorKind;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a frame into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a frame).
    ///
    /// Common causes: a truncated frame, or a firmware sending
    /// something that isn't JSON at all.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but violates the vendor protocol.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The command is not in the vendor's allow-list.
    ///
    /// Never retried: sending it again can't succeed.
    #[error("command {command:?} is not supported by {kind} devices")]
    UnsupportedCommand { kind: VendorKind, command: String },
}
