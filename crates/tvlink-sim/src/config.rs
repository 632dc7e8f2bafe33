//! Simulator knobs.

use std::time::Duration;

/// How a fake television behaves.
///
/// `Default` mimics a real set on a busy LAN: a two second pairing prompt,
/// 50–200 ms of jitter and the occasional error frame. Tests usually start
/// from [`reliable`](Self::reliable) instead.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Name reported by the identification endpoint.
    pub name: String,

    /// How long the on-screen pairing prompt takes to be "accepted" when
    /// the client presents no known credential.
    pub pairing_delay: Duration,

    /// Each reply is held back by a random delay in this range.
    pub network_delay: (Duration, Duration),

    /// Probability (0.0–1.0) that a frame is answered with an error
    /// instead of being processed.
    pub error_rate: f64,

    /// Accept new pairings. When `false`, the prompt is never answered.
    pub auto_accept_pairing: bool,

    /// Reject every pairing attempt, known credential or not.
    pub reject_pairing: bool,

    /// Never answer anything. The socket stays open.
    pub silent: bool,
}

impl SimConfig {
    /// Instant, fault-free behaviour.
    pub fn reliable() -> Self {
        Self {
            pairing_delay: Duration::ZERO,
            network_delay: (Duration::ZERO, Duration::ZERO),
            error_rate: 0.0,
            ..Self::default()
        }
    }

    /// Sets the pairing prompt delay.
    pub fn with_pairing_delay(mut self, delay: Duration) -> Self {
        self.pairing_delay = delay;
        self
    }

    /// Sets the reported device name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "Fake TV".to_owned(),
            pairing_delay: Duration::from_secs(2),
            network_delay: (Duration::from_millis(50), Duration::from_millis(200)),
            error_rate: 0.05,
            auto_accept_pairing: true,
            reject_pairing: false,
            silent: false,
        }
    }
}
