//! The simulated set's picture of itself.

use serde::Serialize;

const CHANNELS: u16 = 100;
const MAX_VOLUME: u8 = 100;

/// Inputs the set can switch to.
pub const INPUTS: &[&str] = &["TV", "HDMI_1", "HDMI_2", "HDMI_3"];

/// Apps the set can launch.
pub const APPS: &[&str] = &["netflix", "youtube.leanback.v4", "amazon"];

/// What the television is currently doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TvState {
    pub power: bool,
    pub volume: u8,
    pub muted: bool,
    pub channel: u16,
    pub input: String,
    pub app: Option<String>,
}

impl Default for TvState {
    fn default() -> Self {
        Self {
            power: true,
            volume: 30,
            muted: false,
            channel: 7,
            input: "HDMI_1".to_owned(),
            app: None,
        }
    }
}

impl TvState {
    pub fn volume_up(&mut self) {
        self.volume = (self.volume + 1).min(MAX_VOLUME);
    }

    pub fn volume_down(&mut self) {
        self.volume = self.volume.saturating_sub(1);
    }

    pub fn set_volume(&mut self, volume: u64) {
        self.volume = volume.min(u64::from(MAX_VOLUME)) as u8;
    }

    /// Channels wrap around 1..=100.
    pub fn channel_up(&mut self) {
        self.channel = self.channel % CHANNELS + 1;
    }

    pub fn channel_down(&mut self) {
        self.channel = if self.channel > 1 {
            self.channel - 1
        } else {
            CHANNELS
        };
    }

    /// Returns `false` for an input the set doesn't have.
    pub fn switch_input(&mut self, input: &str) -> bool {
        if !INPUTS.contains(&input) {
            return false;
        }
        self.input = input.to_owned();
        true
    }

    /// Returns `false` for an app that isn't installed.
    pub fn launch(&mut self, app: &str) -> bool {
        if !APPS.contains(&app) {
            return false;
        }
        self.app = Some(app.to_owned());
        true
    }

    /// Applies a Samsung remote key. Keys with no visible effect are
    /// accepted and ignored.
    pub fn press_key(&mut self, key: &str) {
        match key {
            "KEY_VOLUP" => self.volume_up(),
            "KEY_VOLDOWN" => self.volume_down(),
            "KEY_MUTE" => self.muted = !self.muted,
            "KEY_POWER" => self.power = !self.power,
            "KEY_CHUP" => self.channel_up(),
            "KEY_CHDOWN" => self.channel_down(),
            "KEY_HOME" => self.app = None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamps_at_bounds() {
        let mut state = TvState {
            volume: 100,
            ..TvState::default()
        };
        state.volume_up();
        assert_eq!(state.volume, 100);

        state.set_volume(0);
        state.volume_down();
        assert_eq!(state.volume, 0);

        state.set_volume(500);
        assert_eq!(state.volume, 100);
    }

    #[test]
    fn test_channel_wraps_both_ways() {
        let mut state = TvState {
            channel: 100,
            ..TvState::default()
        };
        state.channel_up();
        assert_eq!(state.channel, 1);
        state.channel_down();
        assert_eq!(state.channel, 100);
    }

    #[test]
    fn test_press_key_mute_toggles() {
        let mut state = TvState::default();
        state.press_key("KEY_MUTE");
        assert!(state.muted);
        state.press_key("KEY_MUTE");
        assert!(!state.muted);
    }

    #[test]
    fn test_press_key_home_closes_app() {
        let mut state = TvState::default();
        assert!(state.launch("netflix"));
        state.press_key("KEY_HOME");
        assert_eq!(state.app, None);
    }

    #[test]
    fn test_switch_input_unknown_is_rejected() {
        let mut state = TvState::default();
        assert!(!state.switch_input("SCART"));
        assert_eq!(state.input, "HDMI_1");
        assert!(state.switch_input("HDMI_3"));
        assert_eq!(state.input, "HDMI_3");
    }
}
