//! Core types shared by every vendor protocol.
//!
//! Adapters translate between these types and vendor frames, so the
//! session layer never looks at a raw Samsung or WebOS message.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Device identity
// ---------------------------------------------------------------------------

/// Which vendor protocol a television speaks.
///
/// Chosen once when a device is discovered; the session built for it
/// keeps the matching adapter for its whole lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum VendorKind {
    /// Samsung Tizen remote-key channel (`samsung.remote.control`).
    #[serde(rename = "samsung")]
    SamsungRemote,

    /// LG WebOS second-screen API (`ssap://` requests).
    #[serde(rename = "webos")]
    WebOs,
}

impl fmt::Display for VendorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SamsungRemote => f.write_str("samsung"),
            Self::WebOs => f.write_str("webos"),
        }
    }
}

impl FromStr for VendorKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "samsung" | "tizen" => Ok(Self::SamsungRemote),
            "webos" | "lg" => Ok(Self::WebOs),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown vendor kind {other:?}"
            ))),
        }
    }
}

/// Where a television lives and how to talk to it.
///
/// This is the identity key for sessions: the same host reached through
/// two different protocols is two distinct devices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    /// IP address or hostname, without port.
    pub host: String,
    /// The vendor protocol spoken at this host.
    pub kind: VendorKind,
}

impl DeviceAddress {
    /// Creates a new address.
    pub fn new(host: impl Into<String>, kind: VendorKind) -> Self {
        Self {
            host: host.into(),
            kind,
        }
    }

    /// Shorthand for a Samsung remote-key device.
    pub fn samsung(host: impl Into<String>) -> Self {
        Self::new(host, VendorKind::SamsungRemote)
    }

    /// Shorthand for a WebOS device.
    pub fn webos(host: impl Into<String>) -> Self {
        Self::new(host, VendorKind::WebOs)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.kind, self.host)
    }
}

// ---------------------------------------------------------------------------
// Commands and acknowledgements
// ---------------------------------------------------------------------------

/// A logical command for one device.
///
/// `name` is vendor vocabulary (`"KEY_VOLUP"` for Samsung, `"volumeUp"` or
/// `"ssap://audio/volumeUp"` for WebOS). The adapter checks it against
/// its allow-list; nothing is translated between vendors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Key code, logical command name, or `ssap://` URI.
    pub name: String,
    /// Optional vendor payload (e.g. `{"id": "netflix"}` for a launch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Command {
    /// Creates a command without payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    /// Attaches a vendor payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl From<&str> for Command {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// The result of a delivered command, as surfaced to callers.
///
/// For fire-and-forget protocols `ok` only means the frame was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the device accepted (or, fire-and-forget, was sent) the
    /// command.
    pub ok: bool,
    /// Human-readable device message, usually present when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Raw response payload from the device, if it sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Ack {
    /// An ack for a frame that was written and needs no response.
    pub fn sent() -> Self {
        Self {
            ok: true,
            detail: None,
            payload: None,
        }
    }

    /// A negative ack carrying the device's explanation.
    pub fn rejected(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
            payload: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// An encoded frame ready to be written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    /// The serialized frame.
    pub bytes: Vec<u8>,
    /// Correlation id the device will echo in its response.
    ///
    /// `None` means the frame is fire-and-forget.
    pub request_id: Option<String>,
}

/// A received frame, classified by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// The device accepted the pairing handshake.
    ///
    /// `token` is the vendor-issued token / client key to present on the
    /// next pairing. Some Samsung sets accept without issuing one.
    PairingAccepted { token: Option<String> },

    /// A response to a command.
    CommandAck {
        request_id: Option<String>,
        ok: bool,
        detail: Option<String>,
        payload: Option<serde_json::Value>,
    },

    /// The device reported an error.
    ///
    /// `code` follows HTTP conventions where the vendor provides one
    /// (401/403 mean the pairing was refused or revoked).
    Error {
        code: Option<u16>,
        message: String,
        request_id: Option<String>,
    },

    /// A frame we don't act on (status broadcasts, client lists, ...).
    Unrecognized,
}

impl InboundEvent {
    /// Returns `true` for errors that mean the stored credential is bad.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Error { code: Some(401 | 403), .. })
    }
}

/// Reads a JSON scalar as a string. Firmwares disagree on whether ids and
/// tokens are strings or numbers.
pub(crate) fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_kind_serializes_lowercase() {
        let json = serde_json::to_string(&VendorKind::SamsungRemote).unwrap();
        assert_eq!(json, "\"samsung\"");
        let json = serde_json::to_string(&VendorKind::WebOs).unwrap();
        assert_eq!(json, "\"webos\"");
    }

    #[test]
    fn test_vendor_kind_from_str_accepts_aliases() {
        assert_eq!("LG".parse::<VendorKind>().unwrap(), VendorKind::WebOs);
        assert_eq!(
            "samsung".parse::<VendorKind>().unwrap(),
            VendorKind::SamsungRemote
        );
        assert!("sony".parse::<VendorKind>().is_err());
    }

    #[test]
    fn test_device_address_same_host_different_kind_are_distinct() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(DeviceAddress::samsung("192.168.1.12"));
        set.insert(DeviceAddress::webos("192.168.1.12"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_device_address_display() {
        let addr = DeviceAddress::webos("192.168.1.12");
        assert_eq!(addr.to_string(), "webos://192.168.1.12");
    }

    #[test]
    fn test_ack_sent_omits_empty_fields() {
        let json = serde_json::to_value(Ack::sent()).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": true }));
    }

    #[test]
    fn test_ack_rejected_carries_detail() {
        let json = serde_json::to_value(Ack::rejected("TV is busy")).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["detail"], "TV is busy");
    }

    #[test]
    fn test_command_payload_defaults_when_missing() {
        let cmd: Command =
            serde_json::from_str(r#"{"name":"volumeUp"}"#).unwrap();
        assert_eq!(cmd, Command::new("volumeUp"));
    }

    #[test]
    fn test_is_auth_failure_only_for_401_and_403() {
        let err = |code| InboundEvent::Error {
            code,
            message: String::new(),
            request_id: None,
        };
        assert!(err(Some(401)).is_auth_failure());
        assert!(err(Some(403)).is_auth_failure());
        assert!(!err(Some(500)).is_auth_failure());
        assert!(!err(None).is_auth_failure());
        assert!(!InboundEvent::Unrecognized.is_auth_failure());
    }
}
