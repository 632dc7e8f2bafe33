//! LG WebOS second-screen API firmware.

use rand::Rng;
use serde_json::{Value, json};

use crate::device::{Device, Firmware, Reply};
use crate::TvState;

const FAULTS: &[&str] = &[
    "401 Insufficient permissions",
    "404 Command not found",
    "500 Internal TV error",
    "503 TV is busy",
];

/// Answers `register` with a client key and `request` frames with a
/// correlated `response`.
///
/// New clients see the pairing prompt: after `pairing_delay` the set
/// sends a `response` carrying the key and then `registered`. A known key
/// is registered immediately. Requests must carry a known `clientKey`.
#[derive(Debug, Default)]
pub struct WebOsFirmware;

fn error(id: Value, message: &str) -> Value {
    json!({ "type": "error", "id": id, "error": message, "payload": {} })
}

fn registered(id: &Value, key: &str) -> Value {
    json!({ "type": "registered", "id": id, "payload": { "client-key": key } })
}

impl WebOsFirmware {
    fn register(&self, frame: &Value, device: &Device) -> Vec<Reply> {
        let config = device.config();
        let id = frame.get("id").cloned().unwrap_or(Value::Null);
        if config.reject_pairing {
            return vec![Reply::now(error(id, "403 User rejected pairing"))];
        }

        let presented = frame["payload"]["client-key"].as_str();
        if let Some(key) = presented.filter(|k| device.knows_credential(k)) {
            return vec![Reply::now(registered(&id, key))];
        }
        if !config.auto_accept_pairing {
            return Vec::new();
        }

        let key = device.issue_credential("fake_client_key_");
        tracing::info!(client_key = %key, "pairing prompt accepted");
        vec![
            Reply::after(
                config.pairing_delay,
                json!({
                    "type": "response",
                    "id": id,
                    "payload": { "client-key": key, "pairingType": "PROMPT", "returnValue": true }
                }),
            ),
            Reply::now(registered(&id, &key)),
        ]
    }

    fn request(&self, frame: &Value, device: &Device) -> Vec<Reply> {
        let id = frame.get("id").cloned().unwrap_or_else(|| json!("default_id"));
        let authorized = frame["clientKey"]
            .as_str()
            .is_some_and(|k| device.knows_credential(k));
        if !authorized {
            return vec![Reply::now(error(id, "401 insufficient permissions"))];
        }

        let uri = frame["uri"].as_str().unwrap_or_default();
        let service = uri.strip_prefix("ssap://").unwrap_or(uri);
        let payload = &frame["payload"];
        let mut body = json!({ "returnValue": true });

        let outcome = device.update_state(|tv: &mut TvState| -> Result<(), &'static str> {
            match service {
                "audio/volumeUp" => tv.volume_up(),
                "audio/volumeDown" => tv.volume_down(),
                "audio/setVolume" => {
                    let volume = payload["volume"].as_u64().ok_or("400 volume required")?;
                    tv.set_volume(volume);
                }
                "audio/getVolume" => body["muted"] = tv.muted.into(),
                "audio/setMute" => {
                    tv.muted = payload["mute"].as_bool().unwrap_or(!tv.muted);
                    body["muted"] = tv.muted.into();
                }
                "system/turnOff" => {
                    tv.power = false;
                    body["power"] = false.into();
                }
                "tv/channelUp" => tv.channel_up(),
                "tv/channelDown" => tv.channel_down(),
                "tv/switchInput" => {
                    let input = payload["inputId"].as_str().unwrap_or_default();
                    if !tv.switch_input(input) {
                        return Err("404 unknown input");
                    }
                    body["inputId"] = input.into();
                }
                "system.launcher/launch" => {
                    let app = payload["id"].as_str().unwrap_or_default();
                    if !tv.launch(app) {
                        return Err("404 app not installed");
                    }
                    body["appId"] = app.into();
                }
                "media.controls/play" | "media.controls/pause" => {}
                _ => return Err("404 no such service or method"),
            }
            if service.starts_with("audio/") {
                body["volume"] = tv.volume.into();
            }
            if service.starts_with("tv/channel") {
                body["channelNumber"] = tv.channel.into();
            }
            Ok(())
        });

        tracing::debug!(uri, ok = outcome.is_ok(), "request handled");
        match outcome {
            Ok(()) => vec![Reply::now(json!({ "type": "response", "id": id, "payload": body }))],
            Err(message) => vec![Reply::now(error(id, message))],
        }
    }
}

impl Firmware for WebOsFirmware {
    const VENDOR: &'static str = "webos";

    fn respond(&self, frame: &Value, device: &Device) -> Vec<Reply> {
        match frame["type"].as_str() {
            Some("register") => self.register(frame, device),
            Some("request") => self.request(frame, device),
            other => {
                tracing::debug!(kind = ?other, "unknown message type");
                Vec::new()
            }
        }
    }

    fn fault(&self, frame: &Value) -> Value {
        let message = FAULTS[rand::rng().random_range(0..FAULTS.len())];
        error(frame.get("id").cloned().unwrap_or(Value::Null), message)
    }

    fn identify(&self, name: &str, state: &TvState) -> Value {
        let status = if state.power { "on" } else { "off" };
        json!({
            "device": {
                "name": name,
                "model": "FAKE-TV-2024",
                "version": "1.0.0",
                "manufacturer": "FakeLG",
                "networkType": "wireless",
                "status": status,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::SimConfig;

    fn register_frame(key: Option<&str>) -> Value {
        let mut frame = json!({
            "type": "register",
            "id": "register_0",
            "payload": { "forcePairing": false, "pairingType": "PROMPT", "manifest": {} }
        });
        if let Some(key) = key {
            frame["payload"]["client-key"] = key.into();
        }
        frame
    }

    fn request_frame(key: &str, uri: &str, payload: Value) -> Value {
        json!({ "type": "request", "id": "request_1", "uri": uri, "payload": payload, "clientKey": key })
    }

    fn paired(config: SimConfig) -> (Device, String) {
        let device = Device::new(config);
        let key = device.issue_credential("fake_client_key_");
        (device, key)
    }

    #[test]
    fn test_register_new_client_prompts_then_registers() {
        let device = Device::new(SimConfig::reliable().with_pairing_delay(Duration::from_secs(2)));

        let replies = WebOsFirmware.respond(&register_frame(None), &device);

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].delay, Duration::from_secs(2));
        assert_eq!(replies[0].frame["type"], "response");
        assert_eq!(replies[0].frame["payload"]["pairingType"], "PROMPT");
        assert_eq!(replies[1].frame["type"], "registered");
        assert_eq!(replies[1].frame["id"], "register_0");
        let key = replies[1].frame["payload"]["client-key"].as_str().unwrap();
        assert!(device.knows_credential(key));
    }

    #[test]
    fn test_register_known_key_skips_prompt() {
        let (device, key) = paired(SimConfig::reliable().with_pairing_delay(Duration::from_secs(2)));

        let replies = WebOsFirmware.respond(&register_frame(Some(&key)), &device);

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].delay, Duration::ZERO);
        assert_eq!(replies[0].frame["payload"]["client-key"], key.as_str());
    }

    #[test]
    fn test_register_rejected_returns_403_error() {
        let device = Device::new(SimConfig {
            reject_pairing: true,
            ..SimConfig::reliable()
        });

        let replies = WebOsFirmware.respond(&register_frame(None), &device);

        assert_eq!(replies[0].frame["type"], "error");
        assert!(replies[0].frame["error"].as_str().unwrap().starts_with("403"));
    }

    #[test]
    fn test_request_without_known_key_returns_401() {
        let device = Device::new(SimConfig::reliable());

        let replies = WebOsFirmware.respond(
            &request_frame("stolen", "ssap://audio/volumeUp", json!({})),
            &device,
        );

        assert_eq!(replies[0].frame["type"], "error");
        assert_eq!(replies[0].frame["id"], "request_1");
        assert_eq!(device.state().volume, 30);
    }

    #[test]
    fn test_request_volume_up_answers_with_volume() {
        let (device, key) = paired(SimConfig::reliable());

        let replies = WebOsFirmware.respond(
            &request_frame(&key, "ssap://audio/volumeUp", json!({})),
            &device,
        );

        let frame = &replies[0].frame;
        assert_eq!(frame["type"], "response");
        assert_eq!(frame["id"], "request_1");
        assert_eq!(frame["payload"]["returnValue"], true);
        assert_eq!(frame["payload"]["volume"], 31);
    }

    #[test]
    fn test_request_launch_unknown_app_is_error() {
        let (device, key) = paired(SimConfig::reliable());

        let replies = WebOsFirmware.respond(
            &request_frame(&key, "ssap://system.launcher/launch", json!({ "id": "minesweeper" })),
            &device,
        );

        assert_eq!(replies[0].frame["type"], "error");
        assert_eq!(device.state().app, None);
    }

    #[test]
    fn test_request_switch_input_changes_state() {
        let (device, key) = paired(SimConfig::reliable());

        WebOsFirmware.respond(
            &request_frame(&key, "ssap://tv/switchInput", json!({ "inputId": "HDMI_2" })),
            &device,
        );

        assert_eq!(device.state().input, "HDMI_2");
    }

    #[test]
    fn test_request_unknown_uri_is_404() {
        let (device, key) = paired(SimConfig::reliable());

        let replies = WebOsFirmware.respond(
            &request_frame(&key, "ssap://com.webos.service.secret/doThing", json!({})),
            &device,
        );

        assert!(replies[0].frame["error"].as_str().unwrap().starts_with("404"));
    }
}
