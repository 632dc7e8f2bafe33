//! `Dispatcher` builder and the command path.
//!
//! This is the entry point for controlling televisions. It ties the
//! layers together: registry → session → protocol adapter → transport.

use std::time::Duration;

use tvlink_protocol::{Ack, AdapterConfig, Command, DeviceAddress};
use tvlink_session::{SessionConfig, SessionHandle, SessionRegistry};
use tvlink_transport::{Connector, WebSocketConnector};

use crate::TvLinkError;

/// Per-call deadlines used by [`Dispatcher::send`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How long `send` waits for the session to connect and pair.
    pub ready_timeout: Duration,

    /// How long `send` waits for a correlated response once the
    /// command is on its way.
    pub command_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
        }
    }
}

/// Builder for configuring a [`Dispatcher`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tvlink::prelude::*;
///
/// let dispatcher = Dispatcher::builder()
///     .ready_timeout(Duration::from_secs(30))
///     .adapter_config(AdapterConfig {
///         webos: WebOsConfig {
///             app_id: "com.example.remote".into(),
///             ..WebOsConfig::default()
///         },
///         ..AdapterConfig::default()
///     })
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct DispatcherBuilder {
    session_config: SessionConfig,
    adapter_config: AdapterConfig,
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session configuration (backoff, pairing timeout, ...).
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the vendor adapter configuration.
    pub fn adapter_config(mut self, config: AdapterConfig) -> Self {
        self.adapter_config = config;
        self
    }

    /// Sets how long `send` waits for a session to become ready.
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.config.ready_timeout = timeout;
        self
    }

    /// Sets how long `send` waits for a correlated response.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Builds a dispatcher that dials real devices over WebSocket.
    pub fn build(self) -> Dispatcher<WebSocketConnector> {
        self.build_with_connector(WebSocketConnector::new())
    }

    /// Builds a dispatcher that opens sockets through `connector`.
    pub fn build_with_connector<C: Connector>(self, connector: C) -> Dispatcher<C> {
        Dispatcher {
            registry: SessionRegistry::with_connector(
                connector,
                self.session_config,
                self.adapter_config,
            ),
            config: self.config,
        }
    }
}

/// Sends commands to televisions, keeping one paired session per device.
///
/// The dispatcher holds no mirror of device state. Every call goes back
/// through the registry, so a session that was removed or replaced is
/// never reused by accident.
pub struct Dispatcher<C: Connector = WebSocketConnector> {
    registry: SessionRegistry<C>,
    config: DispatcherConfig,
}

impl Dispatcher<WebSocketConnector> {
    /// Creates a new builder.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }
}

impl<C: Connector> Dispatcher<C> {
    /// Sends `command` to the device at `address`.
    ///
    /// Creates and pairs the session first if needed. WebOS commands
    /// return once the device's correlated response arrives; Samsung key
    /// presses return as soon as the frame is written.
    ///
    /// # Errors
    /// - [`TvLinkError::Protocol`]: the command is not in the vendor's
    ///   allow-list (checked before any connection attempt)
    /// - [`TvLinkError::Session`]: the session could not be readied in
    ///   time, pairing was rejected, the response timed out, or the
    ///   session closed under the request
    pub async fn send(
        &self,
        address: &DeviceAddress,
        command: impl Into<Command>,
    ) -> Result<Ack, TvLinkError> {
        let command = command.into();
        let session = self.registry.get_or_create(address).await;
        session.adapter().validate(&command)?;

        session.ensure_ready(self.config.ready_timeout).await?;
        let name = command.name.clone();
        let ack = session.request(command, self.config.command_timeout).await?;
        tracing::debug!(%address, command = %name, ok = ack.ok, "command acknowledged");
        Ok(ack)
    }

    /// Registers a device confirmed by discovery without connecting to it.
    pub async fn register(&self, address: &DeviceAddress) -> SessionHandle {
        self.registry.get_or_create(address).await
    }

    /// Connects and pairs the device ahead of the first command.
    ///
    /// # Errors
    /// See [`SessionHandle::ensure_ready`].
    pub async fn connect(&self, address: &DeviceAddress) -> Result<SessionHandle, TvLinkError> {
        Ok(self
            .registry
            .ensure_ready(address, self.config.ready_timeout)
            .await?)
    }

    /// Shuts down the device's session and forgets it.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`](tvlink_session::SessionError::NotFound)
    /// if the device was never registered.
    pub async fn remove(&self, address: &DeviceAddress) -> Result<(), TvLinkError> {
        Ok(self.registry.remove(address).await?)
    }

    /// Shuts down every session.
    pub async fn shutdown(&self) {
        self.registry.shutdown_all().await;
    }

    /// The session registry backing this dispatcher.
    pub fn registry(&self) -> &SessionRegistry<C> {
        &self.registry
    }

    /// The per-call deadlines.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatcher_config_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.ready_timeout, Duration::from_secs(5));
        assert_eq!(config.command_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_overrides_timeouts() {
        let builder = DispatcherBuilder::new()
            .ready_timeout(Duration::from_secs(30))
            .command_timeout(Duration::from_millis(750));
        assert_eq!(builder.config.ready_timeout, Duration::from_secs(30));
        assert_eq!(builder.config.command_timeout, Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_send_unsupported_command_fails_before_connecting() {
        let dispatcher = Dispatcher::builder().build();
        let tv = DeviceAddress::samsung("192.0.2.1");

        let result = dispatcher.send(&tv, "KEY_TELEPORT").await;

        assert!(matches!(result, Err(TvLinkError::Protocol(_))));
        let session = dispatcher.registry().get(&tv).await.unwrap();
        assert_eq!(session.status().sockets_opened, 0);
        assert_eq!(session.status().connect_failures, 0);
    }
}
