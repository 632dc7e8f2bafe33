//! Device session management for tvlink.
//!
//! This crate owns the stateful part of talking to a television:
//!
//! 1. **Session actor**: one Tokio task per device that owns the socket,
//!    the pairing state machine, and the queue of pending commands
//!    ([`SessionHandle`], [`spawn_session`])
//! 2. **Registry**: at most one session per [`DeviceAddress`], created
//!    lazily ([`SessionRegistry`])
//! 3. **Credentials**: pairing tokens and client keys, kept in memory for
//!    the life of the process ([`CredentialStore`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher (above)  ← asks for a ready session, sends one command
//!     ↕
//! Session Layer (this crate)  ← connect, pair, reconnect, correlate
//!     ↕
//! Protocol Layer (below)  ← builds and classifies vendor frames
//!     ↕
//! Transport Layer (below)  ← moves bytes over a WebSocket
//! ```
//!
//! [`DeviceAddress`]: tvlink_protocol::DeviceAddress

mod actor;
mod credentials;
mod error;
mod registry;
mod session;

pub use actor::{SessionHandle, spawn_session};
pub use credentials::{CredentialSlot, CredentialStore};
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{FailureReason, SessionConfig, SessionState, SessionStatus};
