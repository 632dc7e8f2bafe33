//! The session registry: at most one live session per device address.
//!
//! The registry is the only owner of sessions. Other components borrow a
//! [`SessionHandle`] for the duration of one call and go back through the
//! registry next time, so nothing outlives an explicit `remove`.
//!
//! # Concurrency note
//!
//! The address map sits behind a Tokio mutex held only for the lookup or
//! insert itself. Waiting for a session to become ready happens outside
//! the lock, so a slow device never blocks calls for other devices.
//!
//! A session being removed stays in the map as a closing entry until its
//! socket is closed. `get_or_create` for that address waits on the entry
//! instead of dialing a second socket next to the one still closing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tvlink_protocol::{AdapterConfig, DeviceAddress};
use tvlink_transport::{Connector, WebSocketConnector};

use crate::{CredentialStore, SessionConfig, SessionError, SessionHandle, spawn_session};

enum Entry {
    Live(SessionHandle),
    /// Shutting down. The sender is dropped once the socket is closed.
    Closing(watch::Receiver<()>),
}

/// Maps device addresses to their sessions.
///
/// Generic over the [`Connector`] so tests can swap in a scripted one;
/// production code uses the default [`WebSocketConnector`].
pub struct SessionRegistry<C: Connector = WebSocketConnector> {
    sessions: Mutex<HashMap<DeviceAddress, Entry>>,
    connector: Arc<C>,
    config: SessionConfig,
    adapters: AdapterConfig,
    credentials: CredentialStore,
}

impl SessionRegistry<WebSocketConnector> {
    /// Creates a registry that dials real devices.
    pub fn new(config: SessionConfig, adapters: AdapterConfig) -> Self {
        Self::with_connector(WebSocketConnector::new(), config, adapters)
    }
}

impl<C: Connector> SessionRegistry<C> {
    /// Creates a registry that opens sockets through `connector`.
    pub fn with_connector(
        connector: C,
        config: SessionConfig,
        adapters: AdapterConfig,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            connector: Arc::new(connector),
            config,
            adapters,
            credentials: CredentialStore::new(),
        }
    }

    /// Returns the session for `address`, creating it if needed.
    ///
    /// A new session starts `Disconnected` and does not connect yet. A
    /// session that was shut down behind the registry's back is replaced.
    /// If the address is still being removed, this waits until the old
    /// socket is closed.
    pub async fn get_or_create(&self, address: &DeviceAddress) -> SessionHandle {
        loop {
            let mut sessions = self.sessions.lock().await;
            let closing = match sessions.get(address) {
                Some(Entry::Live(handle)) if !handle.is_closed() => return handle.clone(),
                Some(Entry::Live(_)) => {
                    tracing::debug!(%address, "replacing stopped session");
                    None
                }
                // A dead sender means the remover was cancelled; the old
                // actor still stops once its last handle is gone.
                Some(Entry::Closing(done)) if done.has_changed().is_ok() => Some(done.clone()),
                _ => None,
            };
            if let Some(mut done) = closing {
                drop(sessions);
                tracing::debug!(%address, "waiting for previous session to close");
                let _ = done.changed().await;
                continue;
            }

            let handle = spawn_session(
                address.clone(),
                self.adapters.adapter_for(address.kind),
                Arc::clone(&self.connector),
                &self.credentials,
                self.config.clone(),
            );
            sessions.insert(address.clone(), Entry::Live(handle.clone()));
            tracing::info!(%address, sessions = sessions.len(), "session created");
            return handle;
        }
    }

    /// Returns the session for `address` without creating one.
    pub async fn get(&self, address: &DeviceAddress) -> Option<SessionHandle> {
        match self.sessions.lock().await.get(address) {
            Some(Entry::Live(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Returns a ready session for `address`, connecting and pairing it if
    /// needed.
    ///
    /// # Errors
    /// See [`SessionHandle::ensure_ready`].
    pub async fn ensure_ready(
        &self,
        address: &DeviceAddress,
        deadline: Duration,
    ) -> Result<SessionHandle, SessionError> {
        let handle = self.get_or_create(address).await;
        handle.ensure_ready(deadline).await?;
        Ok(handle)
    }

    /// Shuts down the session for `address` and forgets it.
    ///
    /// Returns once the session's socket is closed. Until then the
    /// address can't get a new session.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no live session is registered.
    pub async fn remove(&self, address: &DeviceAddress) -> Result<(), SessionError> {
        let (handle, done) = {
            let mut sessions = self.sessions.lock().await;
            let Some(Entry::Live(_)) = sessions.get(address) else {
                return Err(SessionError::NotFound(address.clone()));
            };
            let (done, closing) = watch::channel(());
            match sessions.insert(address.clone(), Entry::Closing(closing)) {
                Some(Entry::Live(handle)) => (handle, done),
                _ => return Err(SessionError::NotFound(address.clone())),
            }
        };

        handle.shutdown().await;
        self.finish_closing(std::slice::from_ref(address)).await;
        drop(done);
        tracing::info!(%address, "session removed");
        Ok(())
    }

    /// Shuts down every session and waits until all sockets are closed.
    pub async fn shutdown_all(&self) {
        let (closing, done) = {
            let mut sessions = self.sessions.lock().await;
            let (done, rx) = watch::channel(());
            let mut closing = Vec::new();
            for (address, entry) in sessions.iter_mut() {
                if let Entry::Live(handle) = entry {
                    closing.push((address.clone(), handle.clone()));
                    *entry = Entry::Closing(rx.clone());
                }
            }
            (closing, done)
        };

        for (_, handle) in &closing {
            handle.shutdown().await;
        }
        let addresses: Vec<DeviceAddress> = closing.iter().map(|(a, _)| a.clone()).collect();
        self.finish_closing(&addresses).await;
        drop(done);
        tracing::info!(sessions = closing.len(), "all sessions shut down");
    }

    /// Drops the closing entries for `addresses`. Waiters wake once the
    /// caller drops the matching sender.
    async fn finish_closing(&self, addresses: &[DeviceAddress]) {
        let mut sessions = self.sessions.lock().await;
        for address in addresses {
            if matches!(sessions.get(address), Some(Entry::Closing(_))) {
                sessions.remove(address);
            }
        }
    }

    /// The addresses with a live session.
    pub async fn addresses(&self) -> Vec<DeviceAddress> {
        self.sessions
            .lock()
            .await
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Live(_)))
            .map(|(address, _)| address.clone())
            .collect()
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|entry| matches!(entry, Entry::Live(_)))
            .count()
    }

    /// Returns `true` if no live session is registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The pairing credential currently stored for `address`.
    pub fn credential(&self, address: &DeviceAddress) -> Option<String> {
        self.credentials.get(address)
    }

    /// Primes the credential for `address`, e.g. a client key the caller
    /// saved from an earlier run. Used on the session's next pairing.
    pub fn seed_credential(&self, address: &DeviceAddress, credential: impl Into<String>) {
        self.credentials.set(address, credential);
    }

    /// The session settings new sessions are spawned with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
