//! Fake televisions for exercising tvlink without real hardware.
//!
//! Each fake binds two loopback listeners: a WebSocket control endpoint
//! speaking the vendor protocol, and a plain HTTP identification endpoint
//! (`GET /api/v2/`) for discovery. Both share one [`TvState`] that
//! commands mutate, so tests can assert on what the "set" did.
//!
//! - [`FakeSamsungTv`]: `ms.channel.connect` pairing with tokens,
//!   `ms.remote.control` key presses
//! - [`FakeWebOsTv`]: `register` pairing with a prompt delay and client
//!   keys, `request`/`response` commands correlated by id
//!
//! Faults are driven by [`SimConfig`]: random network delay, random
//! error frames, silent or rejecting pairing, and
//! [`drop_connections`](FakeTv::drop_connections) to cut every socket.

mod config;
mod device;
mod samsung;
mod state;
mod webos;

pub use config::SimConfig;
pub use device::{Device, FakeTv, Firmware, Reply, SimError};
pub use samsung::SamsungFirmware;
pub use state::{APPS, INPUTS, TvState};
pub use webos::WebOsFirmware;

/// A fake Samsung set.
pub type FakeSamsungTv = FakeTv<SamsungFirmware>;

/// A fake LG WebOS set.
pub type FakeWebOsTv = FakeTv<WebOsFirmware>;
