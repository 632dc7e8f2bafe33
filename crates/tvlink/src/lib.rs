//! # tvlink
//!
//! Remote control for Samsung and LG WebOS televisions over their LAN
//! WebSocket APIs.
//!
//! tvlink keeps one persistent, paired session per television and hides
//! the reconnect and pairing dance behind a single call: give the
//! [`Dispatcher`] a [`DeviceAddress`] and a [`Command`], and it connects,
//! pairs (reusing the token from last time), writes the command, and
//! returns the device's [`Ack`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tvlink::prelude::*;
//!
//! # async fn run() -> Result<(), TvLinkError> {
//! let dispatcher = Dispatcher::builder().build();
//!
//! let tv = DeviceAddress::webos("192.168.1.20");
//! let ack = dispatcher.send(&tv, "volumeUp").await?;
//! assert!(ack.ok);
//!
//! let samsung = DeviceAddress::samsung("192.168.1.21");
//! dispatcher.send(&samsung, "KEY_MUTE").await?;
//! # Ok(())
//! # }
//! ```
//!
//! Finding televisions on the network is handled by [`discovery`].

pub mod discovery;
mod dispatcher;
mod error;

pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::TvLinkError;

/// Re-exports of the types most callers need.
pub mod prelude {
    pub use crate::discovery::{DeviceInfo, Discovery, DiscoveryConfig, DiscoveryError};
    pub use crate::{Dispatcher, DispatcherBuilder, DispatcherConfig, TvLinkError};
    pub use tvlink_protocol::{
        Ack, AdapterConfig, Command, DeviceAddress, ProtocolError, SamsungConfig,
        VendorKind, WebOsConfig,
    };
    pub use tvlink_session::{
        SessionConfig, SessionError, SessionHandle, SessionRegistry, SessionState,
        SessionStatus,
    };
    pub use tvlink_transport::{Connector, TransportError, WebSocketConnector};
}
