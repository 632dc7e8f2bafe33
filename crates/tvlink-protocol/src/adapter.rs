//! The [`ProtocolAdapter`] trait: one uniform face over every vendor.
//!
//! A session holds exactly one adapter, picked from the device's
//! [`VendorKind`] when the session is created. After that the session never
//! branches on the vendor again; every pairing frame, command frame, and
//! inbound classification goes through this trait.

use std::fmt;
use std::sync::Arc;

use crate::{
    Command, InboundEvent, OutboundFrame, ProtocolError, SamsungConfig,
    SamsungRemoteAdapter, VendorKind, WebOsAdapter, WebOsConfig,
};

/// Vendor-specific encode/decode logic behind a uniform interface.
///
/// ## Trait bounds
///
/// - `Send + Sync` → sessions share the adapter (`Arc<dyn ProtocolAdapter>`)
///   between the actor task and handles that validate commands up front.
/// - `Debug` → sessions are `Debug`, and they hold an adapter.
///
/// The trait is object safe so the session type does not have to be
/// generic over the vendor.
pub trait ProtocolAdapter: Send + Sync + fmt::Debug {
    /// Which vendor this adapter speaks.
    fn kind(&self) -> VendorKind;

    /// The WebSocket URL of the control endpoint on `host`.
    fn endpoint(&self, host: &str) -> String;

    /// Returns `true` if `command` is in this vendor's allow-list.
    fn supports(&self, command: &Command) -> bool;

    /// Fails with [`ProtocolError::UnsupportedCommand`] unless `command` is
    /// in the allow-list.
    fn validate(&self, command: &Command) -> Result<(), ProtocolError> {
        if self.supports(command) {
            Ok(())
        } else {
            Err(ProtocolError::UnsupportedCommand {
                kind: self.kind(),
                command: command.name.clone(),
            })
        }
    }

    /// Builds the handshake frame.
    ///
    /// `previous_token` is the token or client key from an earlier
    /// successful pairing, if the session still holds one.
    fn build_pairing_message(
        &self,
        previous_token: Option<&str>,
    ) -> Result<OutboundFrame, ProtocolError>;

    /// Classifies a received frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is not JSON. Frames
    /// that parse but mean nothing to us are `Ok(InboundEvent::Unrecognized)`.
    fn parse_inbound(&self, data: &[u8]) -> Result<InboundEvent, ProtocolError>;

    /// Builds a command frame, validating `command` first.
    fn build_command_message(
        &self,
        command: &Command,
        token: Option<&str>,
    ) -> Result<OutboundFrame, ProtocolError>;
}

/// Configuration for every vendor adapter.
#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    /// Settings for Samsung remote-key sessions.
    pub samsung: SamsungConfig,
    /// Settings for WebOS sessions.
    pub webos: WebOsConfig,
}

impl AdapterConfig {
    /// Creates a fresh adapter for a device of the given kind.
    ///
    /// Each session gets its own adapter, so correlation counters are
    /// never shared between devices.
    pub fn adapter_for(&self, kind: VendorKind) -> Arc<dyn ProtocolAdapter> {
        match kind {
            VendorKind::SamsungRemote => {
                Arc::new(SamsungRemoteAdapter::new(self.samsung.clone()))
            }
            VendorKind::WebOs => Arc::new(WebOsAdapter::new(self.webos.clone())),
        }
    }
}
