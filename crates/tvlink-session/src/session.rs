//! Session types: configuration, lifecycle state, and the status snapshot
//! that a session actor broadcasts to everyone waiting on it.

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timeouts and limits shared by every session.
///
/// One copy lives in the [`SessionRegistry`](crate::SessionRegistry) and
/// each spawned session gets a clone.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed delay before retrying after a failed connect or a lost socket.
    ///
    /// Default: 1 second.
    pub reconnect_backoff: Duration,

    /// How long a single connect attempt (TCP + TLS + WebSocket handshake)
    /// may take before it counts as failed.
    ///
    /// Default: 5 seconds.
    pub connect_timeout: Duration,

    /// How long to wait for the device to accept pairing. Covers the
    /// on-screen prompt the user has to confirm on first pairing.
    ///
    /// Default: 20 seconds.
    pub pairing_timeout: Duration,

    /// Upper bound on a single socket write.
    ///
    /// Default: 5 seconds.
    pub write_timeout: Duration,

    /// Queued commands older than this are dropped when the socket is lost
    /// instead of being replayed after the reconnect. Only requests whose
    /// own timeout is longer than this can be dropped this way; shorter
    /// ones expire on their own timer first.
    ///
    /// Default: 10 seconds.
    pub queue_staleness: Duration,

    /// Capacity of each session's command channel. Callers wait when it
    /// is full.
    ///
    /// Default: 64.
    pub command_channel_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            pairing_timeout: Duration::from_secs(20),
            write_timeout: Duration::from_secs(5),
            queue_staleness: Duration::from_secs(10),
            command_channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in its connect/pair cycle.
///
/// ```text
///   Disconnected ──connect──→ Connecting ──open──→ AwaitingPairing
///        ↑                        │                      │
///        │                     (error)           (PairingAccepted)
///        │                        ↓                      ↓
///        └────(backoff)──── Disconnected ←──(close)──── Ready
///
///   any state ──shutdown──→ Shutdown   (terminal, no reconnect)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No socket. A retry may be scheduled.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The socket is open and the pairing frame was sent.
    AwaitingPairing,
    /// Paired; commands are written straight to the socket.
    Ready,
    /// Shut down for good. The actor has stopped.
    Shutdown,
}

impl SessionState {
    /// Returns `true` once the session will never become ready again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingPairing => "awaiting-pairing",
            Self::Ready => "ready",
            Self::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Why the session last dropped out of the connect/pair cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The socket could not be opened.
    Connect(String),
    /// The device refused the credential.
    Auth(String),
    /// Pairing failed for a reason other than auth (timeout, device error).
    Pairing(String),
    /// An open socket closed or errored.
    Closed(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(r) => write!(f, "connect failed: {r}"),
            Self::Auth(r) => write!(f, "auth rejected: {r}"),
            Self::Pairing(r) => write!(f, "pairing failed: {r}"),
            Self::Closed(r) => write!(f, "connection lost: {r}"),
        }
    }
}

/// A snapshot of a session, broadcast on every change.
///
/// The counters only grow, so a waiter can tell what happened since it
/// started waiting by comparing two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Bumped on every connect attempt and every lost socket.
    pub generation: u64,
    /// Sockets successfully opened so far.
    pub sockets_opened: u64,
    /// Connect attempts that failed or timed out.
    pub connect_failures: u64,
    /// Pairings rejected, or credentials revoked, by the device.
    pub auth_failures: u64,
    /// The most recent failure, if any.
    pub last_failure: Option<FailureReason>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: SessionState::Disconnected,
            generation: 0,
            sockets_opened: 0,
            connect_failures: 0,
            auth_failures: 0,
            last_failure: None,
        }
    }
}
