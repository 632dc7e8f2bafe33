//! Vendor wire protocols for tvlink.
//!
//! This crate defines the "language" the controller speaks with each
//! kind of television:
//!
//! - **Types** ([`DeviceAddress`], [`Command`], [`Ack`], [`InboundEvent`],
//!   [`OutboundFrame`]): the common message model shared by all vendors.
//! - **Adapters** ([`ProtocolAdapter`] trait, [`SamsungRemoteAdapter`],
//!   [`WebOsAdapter`]): how that model maps onto each vendor's frames.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong building or
//!   classifying a frame.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (pairing and reconnect state). It doesn't know about sockets: it only
//! knows how to build and classify frames.
//!
//! ```text
//! Transport (bytes) → Protocol (InboundEvent) → Session (pairing state)
//! ```

mod adapter;
mod codec;
mod error;
mod samsung;
mod types;
mod webos;

pub use adapter::{AdapterConfig, ProtocolAdapter};
pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use samsung::{SAMSUNG_KEYS, SamsungConfig, SamsungRemoteAdapter};
pub use types::{
    Ack, Command, DeviceAddress, InboundEvent, OutboundFrame, VendorKind,
};
pub use webos::{WebOsAdapter, WebOsConfig};
