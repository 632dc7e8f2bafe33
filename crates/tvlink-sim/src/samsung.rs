//! Samsung remote-control channel firmware.

use rand::Rng;
use serde_json::{Value, json};

use crate::device::{Device, Firmware, Reply};
use crate::TvState;

const FAULTS: &[(&str, &str)] = &[
    ("401", "Invalid token"),
    ("404", "Command not supported"),
    ("500", "Internal TV error"),
];

/// Answers `ms.channel.connect` with a token and `ms.remote.control`
/// with `{successful: true}`.
///
/// A known token is accepted straight away; an unknown or missing one
/// costs the pairing prompt delay and yields a fresh token.
#[derive(Debug, Default)]
pub struct SamsungFirmware;

fn connected(token: &str) -> Value {
    json!({ "event": "ms.channel.connect", "data": { "token": token } })
}

impl SamsungFirmware {
    fn pair(&self, frame: &Value, device: &Device) -> Vec<Reply> {
        let config = device.config();
        if config.reject_pairing {
            return vec![Reply::now(json!({ "event": "ms.channel.unauthorized" }))];
        }

        let presented = frame["params"]["token"].as_str();
        if let Some(token) = presented.filter(|t| device.knows_credential(t)) {
            return vec![Reply::now(connected(token))];
        }
        if !config.auto_accept_pairing {
            return Vec::new();
        }

        let token = device.issue_credential("FAKE_TOKEN_");
        tracing::info!(%token, "pairing prompt accepted");
        vec![Reply::after(config.pairing_delay, connected(&token))]
    }

    fn press(&self, frame: &Value, device: &Device) -> Vec<Reply> {
        let Some(key) = frame["params"]["DataOfCmd"].as_str() else {
            return Vec::new();
        };
        device.update_state(|tv| tv.press_key(key));
        tracing::debug!(key, "key pressed");
        vec![Reply::now(json!({
            "event": "ms.remote.control",
            "data": { "successful": true }
        }))]
    }
}

impl Firmware for SamsungFirmware {
    const VENDOR: &'static str = "samsung";

    fn respond(&self, frame: &Value, device: &Device) -> Vec<Reply> {
        match frame["method"].as_str() {
            Some("ms.channel.connect") => self.pair(frame, device),
            Some("ms.remote.control") => self.press(frame, device),
            _ => Vec::new(),
        }
    }

    fn fault(&self, _frame: &Value) -> Value {
        let (code, message) = FAULTS[rand::rng().random_range(0..FAULTS.len())];
        json!({ "error": true, "code": code, "message": message })
    }

    fn identify(&self, name: &str, state: &TvState) -> Value {
        let power = if state.power { "on" } else { "standby" };
        json!({
            "name": name,
            "version": "2.0.0",
            "device": {
                "name": name,
                "type": "Samsung SmartTV",
                "modelName": "FAKE-TV-2024",
                "manufacturer": "Samsung Electronics",
                "PowerState": power,
            }
        })
    }
}
