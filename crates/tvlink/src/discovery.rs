//! Finding televisions on the local network.
//!
//! Both vendors serve a small identification document over plain HTTP at
//! `GET /api/v2/` (port 8001 on Samsung sets, 3000 on WebOS). A host
//! counts as a television when that document carries a `device` object.
//! Discovery only confirms addresses; it never opens a control socket.

use std::ops::RangeInclusive;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tvlink_protocol::{DeviceAddress, VendorKind};

/// Errors from probing a single host.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    /// The host did not answer, answered with an error status, or sent
    /// something that isn't JSON.
    #[error("probe of {host} failed: {source}")]
    Probe {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    /// The host answered but doesn't describe a television.
    #[error("{0} is not a compatible device")]
    Incompatible(String),
}

/// Probe settings.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Identification port on Samsung sets.
    pub samsung_port: u16,
    /// Identification port on WebOS sets.
    pub webos_port: u16,
    /// Per-host deadline for the whole HTTP exchange.
    pub probe_timeout: Duration,
    /// How many hosts a scan probes at once.
    pub concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            samsung_port: 8001,
            webos_port: 3000,
            probe_timeout: Duration::from_secs(3),
            concurrency: 16,
        }
    }
}

/// A television that answered the identification probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub address: DeviceAddress,
    /// The set's self-reported name, if it gave one.
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct Identification {
    device: Option<Value>,
}

/// Probes hosts for televisions.
#[derive(Debug, Clone)]
pub struct Discovery {
    client: reqwest::Client,
    config: DiscoveryConfig,
}

impl Discovery {
    /// Creates a prober with the given settings.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::Client`] if the HTTP client can't be built.
    pub fn new(config: DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .no_proxy()
            .build()
            .map_err(DiscoveryError::Client)?;
        Ok(Self { client, config })
    }

    /// The identification port probed for `kind`.
    pub fn port_for(&self, kind: VendorKind) -> u16 {
        match kind {
            VendorKind::SamsungRemote => self.config.samsung_port,
            VendorKind::WebOs => self.config.webos_port,
        }
    }

    /// Checks whether `host` is a television of the given kind.
    ///
    /// # Errors
    /// - [`DiscoveryError::Probe`]: no usable HTTP answer
    /// - [`DiscoveryError::Incompatible`]: the answer has no `device`
    pub async fn probe(&self, host: &str, kind: VendorKind) -> Result<DeviceInfo, DiscoveryError> {
        let url = format!("http://{host}:{}/api/v2/", self.port_for(kind));
        let probe_err = |source| DiscoveryError::Probe {
            host: host.to_owned(),
            source,
        };

        let body: Identification = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(probe_err)?
            .json()
            .await
            .map_err(probe_err)?;

        let device = body
            .device
            .filter(Value::is_object)
            .ok_or_else(|| DiscoveryError::Incompatible(host.to_owned()))?;
        let name = device
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_owned);

        tracing::info!(host, %kind, name = ?name, "found television");
        Ok(DeviceInfo {
            address: DeviceAddress::new(host, kind),
            name,
        })
    }

    /// Probes `prefix + i` for every `i` in `range` and returns the hosts
    /// that answered, in address order.
    ///
    /// `prefix` is the subnet with its trailing dot, e.g. `"192.168.1."`.
    /// Hosts that don't answer are skipped.
    pub async fn scan(
        &self,
        prefix: &str,
        range: RangeInclusive<u8>,
        kind: VendorKind,
    ) -> Vec<DeviceInfo> {
        tracing::info!(subnet = prefix, ?range, %kind, "scanning");

        let mut found: Vec<(u8, DeviceInfo)> = stream::iter(range)
            .map(|i| async move {
                let host = format!("{prefix}{i}");
                match self.probe(&host, kind).await {
                    Ok(info) => Some((i, info)),
                    Err(e) => {
                        tracing::debug!(host, error = %e, "probe failed");
                        None
                    }
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .filter_map(|hit| async move { hit })
            .collect()
            .await;

        found.sort_by_key(|(i, _)| *i);
        found.into_iter().map(|(_, info)| info).collect()
    }

    /// The probe settings.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }
}
