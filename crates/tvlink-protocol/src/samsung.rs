//! Samsung remote-key channel (`samsung.remote.control`).
//!
//! Pairing sends `ms.channel.connect` with the token issued last time (or
//! `null`); the set answers with an `ms.channel.connect` event carrying a
//! token. Key presses are a fixed `ms.remote.control` envelope. The set's
//! `ms.remote.control` replies are not correlated to a particular key, so
//! command frames never carry a request id.

use serde::Serialize;
use serde_json::Value;

use crate::types::scalar_to_string;
use crate::{
    Codec, Command, InboundEvent, JsonCodec, OutboundFrame, ProtocolAdapter,
    ProtocolError, VendorKind,
};

/// Keys the remote channel accepts.
pub const SAMSUNG_KEYS: &[&str] = &[
    "KEY_POWER",
    "KEY_VOLUP",
    "KEY_VOLDOWN",
    "KEY_MUTE",
    "KEY_CHUP",
    "KEY_CHDOWN",
    "KEY_HOME",
    "KEY_RETURN",
    "KEY_ENTER",
    "KEY_UP",
    "KEY_DOWN",
    "KEY_LEFT",
    "KEY_RIGHT",
    "KEY_MENU",
    "KEY_SOURCE",
    "KEY_0",
    "KEY_1",
    "KEY_2",
    "KEY_3",
    "KEY_4",
    "KEY_5",
    "KEY_6",
    "KEY_7",
    "KEY_8",
    "KEY_9",
];

/// Settings for [`SamsungRemoteAdapter`].
#[derive(Debug, Clone)]
pub struct SamsungConfig {
    /// Client name shown in the TV's "allow this device?" prompt.
    pub name: String,
    /// Application id sent with the pairing request.
    pub app_id: String,
    /// WebSocket port of the remote channel.
    pub port: u16,
    /// Use `wss://` (default) or plain `ws://`.
    pub secure: bool,
}

impl Default for SamsungConfig {
    fn default() -> Self {
        Self {
            name: "RemoteControl".into(),
            app_id: "12345".into(),
            port: 8002,
            secure: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Envelope<P> {
    method: &'static str,
    params: P,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectParams<'a> {
    name: &'a str,
    token: Option<&'a str>,
    app_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RemoteControlParams<'a> {
    cmd: &'static str,
    data_of_cmd: &'a str,
    option: &'static str,
    type_of_remote: &'static str,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Adapter for Samsung sets speaking the remote-key channel.
#[derive(Debug, Clone)]
pub struct SamsungRemoteAdapter {
    config: SamsungConfig,
    codec: JsonCodec,
}

impl SamsungRemoteAdapter {
    /// Creates an adapter with the given settings.
    pub fn new(config: SamsungConfig) -> Self {
        Self {
            config,
            codec: JsonCodec,
        }
    }
}

impl Default for SamsungRemoteAdapter {
    fn default() -> Self {
        Self::new(SamsungConfig::default())
    }
}

impl ProtocolAdapter for SamsungRemoteAdapter {
    fn kind(&self) -> VendorKind {
        VendorKind::SamsungRemote
    }

    fn endpoint(&self, host: &str) -> String {
        let scheme = if self.config.secure { "wss" } else { "ws" };
        format!(
            "{scheme}://{host}:{}/api/v2/channels/samsung.remote.control",
            self.config.port
        )
    }

    fn supports(&self, command: &Command) -> bool {
        SAMSUNG_KEYS.contains(&command.name.as_str())
    }

    fn build_pairing_message(
        &self,
        previous_token: Option<&str>,
    ) -> Result<OutboundFrame, ProtocolError> {
        let bytes = self.codec.encode(&Envelope {
            method: "ms.channel.connect",
            params: ConnectParams {
                name: &self.config.name,
                token: previous_token,
                app_id: &self.config.app_id,
            },
        })?;
        Ok(OutboundFrame {
            bytes,
            request_id: None,
        })
    }

    fn parse_inbound(&self, data: &[u8]) -> Result<InboundEvent, ProtocolError> {
        let frame: Value = self.codec.decode(data)?;

        if frame.get("error").and_then(Value::as_bool) == Some(true) {
            let code = frame.get("code").and_then(|c| match c {
                Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            });
            let message = frame
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("device error")
                .to_owned();
            return Ok(InboundEvent::Error {
                code,
                message,
                request_id: None,
            });
        }

        let event = frame.get("event").and_then(Value::as_str);
        let data = frame.get("data");
        Ok(match event {
            Some("ms.channel.connect") => InboundEvent::PairingAccepted {
                token: data
                    .and_then(|d| d.get("token"))
                    .and_then(scalar_to_string),
            },
            Some("ms.channel.unauthorized") => InboundEvent::Error {
                code: Some(401),
                message: "pairing refused by device".into(),
                request_id: None,
            },
            Some("ms.channel.timeOut") => InboundEvent::Error {
                code: Some(408),
                message: "pairing prompt timed out on device".into(),
                request_id: None,
            },
            Some("ms.remote.control") => InboundEvent::CommandAck {
                request_id: None,
                ok: data
                    .and_then(|d| d.get("successful"))
                    .and_then(Value::as_bool)
                    != Some(false),
                detail: None,
                payload: data.cloned(),
            },
            _ => InboundEvent::Unrecognized,
        })
    }

    fn build_command_message(
        &self,
        command: &Command,
        _token: Option<&str>,
    ) -> Result<OutboundFrame, ProtocolError> {
        self.validate(command)?;
        let bytes = self.codec.encode(&Envelope {
            method: "ms.remote.control",
            params: RemoteControlParams {
                cmd: "Click",
                data_of_cmd: &command.name,
                option: "false",
                type_of_remote: "SendRemoteKey",
            },
        })?;
        Ok(OutboundFrame {
            bytes,
            request_id: None,
        })
    }
}
