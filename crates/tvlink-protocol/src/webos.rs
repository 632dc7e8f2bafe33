//! LG WebOS second-screen API (`ssap://`).
//!
//! Pairing sends a `register` frame carrying the app manifest; the set
//! shows a prompt (unless it recognizes the client key) and answers with a
//! `registered` frame holding the key. Commands are `request` frames
//! addressed to an `ssap://` URI and correlated to their `response` by
//! `id`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;

use crate::types::scalar_to_string;
use crate::{
    Codec, Command, InboundEvent, JsonCodec, OutboundFrame, ProtocolAdapter,
    ProtocolError, VendorKind,
};

/// One allow-listed WebOS command.
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    name: &'static str,
    uri: &'static str,
    expects_response: bool,
}

const fn endpoint(name: &'static str, uri: &'static str) -> Endpoint {
    Endpoint {
        name,
        uri,
        expects_response: true,
    }
}

const ENDPOINTS: &[Endpoint] = &[
    endpoint("volumeUp", "ssap://audio/volumeUp"),
    endpoint("volumeDown", "ssap://audio/volumeDown"),
    endpoint("mute", "ssap://audio/setMute"),
    endpoint("setVolume", "ssap://audio/setVolume"),
    endpoint("getVolume", "ssap://audio/getVolume"),
    // The set drops the socket while powering down instead of answering.
    Endpoint {
        name: "powerOff",
        uri: "ssap://system/turnOff",
        expects_response: false,
    },
    endpoint("channelUp", "ssap://tv/channelUp"),
    endpoint("channelDown", "ssap://tv/channelDown"),
    endpoint("launch", "ssap://system.launcher/launch"),
    endpoint("switchInput", "ssap://tv/switchInput"),
    endpoint("play", "ssap://media.controls/play"),
    endpoint("pause", "ssap://media.controls/pause"),
];

fn lookup(name: &str) -> Option<&'static Endpoint> {
    ENDPOINTS.iter().find(|e| e.name == name || e.uri == name)
}

/// Settings for [`WebOsAdapter`].
#[derive(Debug, Clone)]
pub struct WebOsConfig {
    /// Application id in the pairing manifest.
    pub app_id: String,
    /// Application version in the pairing manifest.
    pub app_version: String,
    /// Permissions requested in the pairing manifest.
    pub permissions: Vec<String>,
    /// Ask the set to prompt even if it knows the client key.
    pub force_pairing: bool,
    /// WebSocket port of the API.
    pub port: u16,
    /// Use `wss://` instead of plain `ws://`.
    pub secure: bool,
}

impl Default for WebOsConfig {
    fn default() -> Self {
        Self {
            app_id: "com.yourcompany.remote".into(),
            app_version: "1.0".into(),
            permissions: [
                "CONTROL_POWER",
                "CONTROL_INPUT_TV",
                "CONTROL_AUDIO",
                "CONTROL_INPUT_MEDIA_PLAYBACK",
                "LAUNCH",
                "READ_TV_CURRENT_CHANNEL",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            force_pairing: false,
            port: 3000,
            secure: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    app_version: &'a str,
    permissions: &'a [String],
    app_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload<'a> {
    force_pairing: bool,
    pairing_type: &'static str,
    #[serde(rename = "client-key", skip_serializing_if = "Option::is_none")]
    client_key: Option<&'a str>,
    manifest: Manifest<'a>,
}

#[derive(Serialize)]
struct Register<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: &'a str,
    payload: RegisterPayload<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Request<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    uri: &'static str,
    payload: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_key: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Adapter for LG sets speaking the WebOS second-screen API.
///
/// Holds the correlation counter, so each session needs its own instance.
#[derive(Debug)]
pub struct WebOsAdapter {
    config: WebOsConfig,
    codec: JsonCodec,
    next_id: AtomicU64,
}

impl WebOsAdapter {
    /// Creates an adapter with the given settings.
    pub fn new(config: WebOsConfig) -> Self {
        Self {
            config,
            codec: JsonCodec,
            next_id: AtomicU64::new(0),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}_{n}")
    }
}

impl Default for WebOsAdapter {
    fn default() -> Self {
        Self::new(WebOsConfig::default())
    }
}

impl ProtocolAdapter for WebOsAdapter {
    fn kind(&self) -> VendorKind {
        VendorKind::WebOs
    }

    fn endpoint(&self, host: &str) -> String {
        let scheme = if self.config.secure { "wss" } else { "ws" };
        format!("{scheme}://{host}:{}", self.config.port)
    }

    fn supports(&self, command: &Command) -> bool {
        lookup(&command.name).is_some()
    }

    fn build_pairing_message(
        &self,
        previous_token: Option<&str>,
    ) -> Result<OutboundFrame, ProtocolError> {
        let id = self.next_id("register");
        let bytes = self.codec.encode(&Register {
            kind: "register",
            id: &id,
            payload: RegisterPayload {
                force_pairing: self.config.force_pairing,
                pairing_type: "PROMPT",
                client_key: previous_token,
                manifest: Manifest {
                    app_version: &self.config.app_version,
                    permissions: &self.config.permissions,
                    app_id: &self.config.app_id,
                },
            },
        })?;
        Ok(OutboundFrame {
            bytes,
            request_id: Some(id),
        })
    }

    fn parse_inbound(&self, data: &[u8]) -> Result<InboundEvent, ProtocolError> {
        let frame: Value = self.codec.decode(data)?;
        let id = frame.get("id").and_then(scalar_to_string);
        let payload = frame.get("payload");
        let client_key = payload
            .and_then(|p| p.get("client-key"))
            .and_then(scalar_to_string);

        Ok(match frame.get("type").and_then(Value::as_str) {
            Some("registered") => InboundEvent::PairingAccepted { token: client_key },
            Some("response") if client_key.is_some() => {
                InboundEvent::PairingAccepted { token: client_key }
            }
            Some("response") => InboundEvent::CommandAck {
                request_id: id,
                ok: payload
                    .and_then(|p| p.get("returnValue"))
                    .and_then(Value::as_bool)
                    != Some(false),
                detail: payload
                    .and_then(|p| p.get("errorText"))
                    .and_then(Value::as_str)
                    .map(String::from),
                payload: payload.cloned(),
            },
            Some("error") => {
                let message = frame
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("device error")
                    .to_owned();
                InboundEvent::Error {
                    code: leading_code(&message),
                    message,
                    request_id: id,
                }
            }
            _ => InboundEvent::Unrecognized,
        })
    }

    fn build_command_message(
        &self,
        command: &Command,
        token: Option<&str>,
    ) -> Result<OutboundFrame, ProtocolError> {
        let Some(endpoint) = lookup(&command.name) else {
            return Err(ProtocolError::UnsupportedCommand {
                kind: VendorKind::WebOs,
                command: command.name.clone(),
            });
        };

        let id = endpoint.expects_response.then(|| self.next_id("request"));
        let empty = Value::Object(Default::default());
        let bytes = self.codec.encode(&Request {
            kind: "request",
            id: id.as_deref(),
            uri: endpoint.uri,
            payload: command.payload.as_ref().unwrap_or(&empty),
            client_key: token,
        })?;
        Ok(OutboundFrame {
            bytes,
            request_id: id,
        })
    }
}

/// Parses the HTTP-style status at the front of a WebOS error string
/// (`"401 insufficient permissions"` → 401).
fn leading_code(message: &str) -> Option<u16> {
    let digits: String = message
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_json(frame: &OutboundFrame) -> Value {
        serde_json::from_slice(&frame.bytes).unwrap()
    }

    #[test]
    fn test_endpoint_default_is_plain_3000() {
        assert_eq!(WebOsAdapter::default().endpoint("10.0.0.5"), "ws://10.0.0.5:3000");
    }

    #[test]
    fn test_build_pairing_message_first_time_has_no_client_key() {
        let adapter = WebOsAdapter::default();
        let frame = adapter.build_pairing_message(None).unwrap();
        let json = as_json(&frame);

        assert_eq!(frame.request_id.as_deref(), Some("register_0"));
        assert_eq!(json["type"], "register");
        assert_eq!(json["id"], "register_0");
        assert_eq!(json["payload"]["forcePairing"], false);
        assert_eq!(json["payload"]["manifest"]["appId"], "com.yourcompany.remote");
        assert_eq!(json["payload"]["manifest"]["appVersion"], "1.0");
        assert!(json["payload"]["manifest"]["permissions"].is_array());
        assert!(json["payload"].get("client-key").is_none());
    }

    #[test]
    fn test_build_pairing_message_carries_previous_key() {
        let adapter = WebOsAdapter::default();
        let frame = adapter.build_pairing_message(Some("K1")).unwrap();
        assert_eq!(as_json(&frame)["payload"]["client-key"], "K1");
    }

    #[test]
    fn test_build_command_message_assigns_fresh_ids() {
        let adapter = WebOsAdapter::default();
        let first = adapter
            .build_command_message(&Command::new("volumeUp"), Some("K1"))
            .unwrap();
        let second = adapter
            .build_command_message(&Command::new("ssap://audio/volumeUp"), Some("K1"))
            .unwrap();

        assert_ne!(first.request_id, second.request_id);
        assert_eq!(
            as_json(&first),
            json!({
                "type": "request",
                "id": first.request_id.clone().unwrap(),
                "uri": "ssap://audio/volumeUp",
                "payload": {},
                "clientKey": "K1"
            })
        );
    }

    #[test]
    fn test_build_command_message_passes_payload() {
        let adapter = WebOsAdapter::default();
        let frame = adapter
            .build_command_message(
                &Command::new("launch").with_payload(json!({ "id": "netflix" })),
                None,
            )
            .unwrap();
        let json = as_json(&frame);
        assert_eq!(json["uri"], "ssap://system.launcher/launch");
        assert_eq!(json["payload"]["id"], "netflix");
        assert!(json.get("clientKey").is_none());
    }

    #[test]
    fn test_build_command_message_power_off_is_uncorrelated() {
        let adapter = WebOsAdapter::default();
        let frame = adapter
            .build_command_message(&Command::new("powerOff"), Some("K1"))
            .unwrap();
        assert!(frame.request_id.is_none());
        assert!(as_json(&frame).get("id").is_none());
    }

    #[test]
    fn test_build_command_message_unknown_uri_is_unsupported() {
        let err = WebOsAdapter::default()
            .build_command_message(&Command::new("ssap://com.webos.secret/root"), None)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnsupportedCommand {
                kind: VendorKind::WebOs,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_inbound_registered_yields_client_key() {
        let event = WebOsAdapter::default()
            .parse_inbound(
                br#"{"type":"registered","id":"register_0","payload":{"client-key":"K1"}}"#,
            )
            .unwrap();
        assert_eq!(
            event,
            InboundEvent::PairingAccepted {
                token: Some("K1".into())
            }
        );
    }

    #[test]
    fn test_parse_inbound_response_with_client_key_is_pairing() {
        let event = WebOsAdapter::default()
            .parse_inbound(
                br#"{"type":"response","id":"register_0","payload":{"client-key":"K1","pairingType":"PROMPT","returnValue":true}}"#,
            )
            .unwrap();
        assert!(matches!(event, InboundEvent::PairingAccepted { .. }));
    }

    #[test]
    fn test_parse_inbound_response_is_correlated_ack() {
        let event = WebOsAdapter::default()
            .parse_inbound(
                br#"{"type":"response","id":"request_3","payload":{"returnValue":true,"volume":31}}"#,
            )
            .unwrap();
        match event {
            InboundEvent::CommandAck {
                request_id,
                ok,
                detail,
                payload,
            } => {
                assert_eq!(request_id.as_deref(), Some("request_3"));
                assert!(ok);
                assert_eq!(detail, None);
                assert_eq!(payload.unwrap()["volume"], 31);
            }
            other => panic!("expected CommandAck, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_inbound_return_value_false_is_not_ok() {
        let event = WebOsAdapter::default()
            .parse_inbound(
                br#"{"type":"response","id":"request_1","payload":{"returnValue":false,"errorText":"no such app"}}"#,
            )
            .unwrap();
        assert!(matches!(
            event,
            InboundEvent::CommandAck { ok: false, detail: Some(ref d), .. } if d == "no such app"
        ));
    }

    #[test]
    fn test_parse_inbound_error_parses_leading_code() {
        let event = WebOsAdapter::default()
            .parse_inbound(
                br#"{"type":"error","id":"request_2","error":"401 Insufficient permissions","payload":{}}"#,
            )
            .unwrap();
        assert_eq!(
            event,
            InboundEvent::Error {
                code: Some(401),
                message: "401 Insufficient permissions".into(),
                request_id: Some("request_2".into()),
            }
        );
        assert!(event.is_auth_failure());
    }

    #[test]
    fn test_parse_inbound_numeric_id_is_stringified() {
        let event = WebOsAdapter::default()
            .parse_inbound(br#"{"type":"response","id":7,"payload":{}}"#)
            .unwrap();
        assert!(matches!(
            event,
            InboundEvent::CommandAck { request_id: Some(ref id), .. } if id == "7"
        ));
    }

    #[test]
    fn test_parse_inbound_unknown_type_is_unrecognized() {
        let event = WebOsAdapter::default()
            .parse_inbound(br#"{"type":"hello","payload":{}}"#)
            .unwrap();
        assert_eq!(event, InboundEvent::Unrecognized);
    }

    #[test]
    fn test_leading_code_without_digits_is_none() {
        assert_eq!(leading_code("busy"), None);
        assert_eq!(leading_code("503 TV is busy"), Some(503));
    }
}
