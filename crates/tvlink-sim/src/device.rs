//! The vendor-neutral part of a fake television: listeners, connection
//! tasks, fault injection, and the bookkeeping tests assert on.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rand::Rng;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tvlink_transport::{
    Connection, ConnectionId, ServerConnection, Transport, TransportError,
    WebSocketTransport,
};

use crate::{SimConfig, TvState};

/// Errors starting a fake television.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The control endpoint could not be bound.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The identification endpoint could not be bound.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A frame the set sends back, `delay` after the previous one.
#[derive(Debug, Clone)]
pub struct Reply {
    pub delay: Duration,
    pub frame: Value,
}

impl Reply {
    pub fn now(frame: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            frame,
        }
    }

    pub fn after(delay: Duration, frame: Value) -> Self {
        Self { delay, frame }
    }
}

/// A vendor's side of the conversation.
pub trait Firmware: Default + Send + Sync + 'static {
    /// Vendor label for logs.
    const VENDOR: &'static str;

    /// Answers one client frame. An empty vec means no answer.
    fn respond(&self, frame: &Value, device: &Device) -> Vec<Reply>;

    /// The error frame sent instead of an answer when a fault is injected.
    fn fault(&self, frame: &Value) -> Value;

    /// The identification document served at `GET /api/v2/`.
    fn identify(&self, name: &str, state: &TvState) -> Value;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by every connection to one fake set.
pub struct Device {
    config: Mutex<SimConfig>,
    state: Mutex<TvState>,
    credentials: Mutex<HashSet<String>>,
    frames: Mutex<Vec<Value>>,
    accepted: AtomicUsize,
    links: Mutex<HashMap<ConnectionId, Arc<ServerConnection>>>,
}

impl Device {
    pub(crate) fn new(config: SimConfig) -> Self {
        Self {
            config: Mutex::new(config),
            state: Mutex::new(TvState::default()),
            credentials: Mutex::new(HashSet::new()),
            frames: Mutex::new(Vec::new()),
            accepted: AtomicUsize::new(0),
            links: Mutex::new(HashMap::new()),
        }
    }

    /// A snapshot of the current settings.
    pub fn config(&self) -> SimConfig {
        lock(&self.config).clone()
    }

    /// A snapshot of the set's state.
    pub fn state(&self) -> TvState {
        lock(&self.state).clone()
    }

    /// Mutates the set's state.
    pub fn update_state<R>(&self, f: impl FnOnce(&mut TvState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    /// Returns `true` if `credential` was issued by this set and not
    /// forgotten since.
    pub fn knows_credential(&self, credential: &str) -> bool {
        lock(&self.credentials).contains(credential)
    }

    /// Issues and remembers a fresh credential.
    pub fn issue_credential(&self, prefix: &str) -> String {
        let credential = format!("{prefix}{:08x}", rand::rng().random::<u32>());
        lock(&self.credentials).insert(credential.clone());
        credential
    }
}

/// A running fake television.
///
/// Dropping it stops both listeners and cuts every connection.
pub struct FakeTv<F: Firmware> {
    addr: SocketAddr,
    info_addr: SocketAddr,
    device: Arc<Device>,
    accept_task: JoinHandle<()>,
    info_task: JoinHandle<()>,
    _firmware: PhantomData<F>,
}

impl<F: Firmware> FakeTv<F> {
    /// Starts the set on random loopback ports.
    ///
    /// # Errors
    /// Returns [`SimError`] if either listener can't be bound.
    pub async fn start(config: SimConfig) -> Result<Self, SimError> {
        Self::bind("127.0.0.1:0", "127.0.0.1:0", config).await
    }

    /// Starts the set with its control endpoint on `control` and its
    /// identification endpoint on `info`.
    ///
    /// # Errors
    /// Returns [`SimError`] if either listener can't be bound.
    pub async fn bind(control: &str, info: &str, config: SimConfig) -> Result<Self, SimError> {
        let transport = WebSocketTransport::bind(control).await?;
        let addr = transport.local_addr()?;
        let listener = TcpListener::bind(info).await?;
        let info_addr = listener.local_addr()?;

        let device = Arc::new(Device::new(config));
        let firmware = Arc::new(F::default());

        let accept_task = tokio::spawn(accept_loop(
            transport,
            Arc::clone(&firmware),
            Arc::clone(&device),
        ));

        let app = Router::new()
            .route("/api/v2/", get(identify::<F>))
            .with_state((firmware, Arc::clone(&device)));
        let info_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "identification endpoint failed");
            }
        });

        tracing::info!(vendor = F::VENDOR, %addr, %info_addr, "fake television running");
        Ok(Self {
            addr,
            info_addr,
            device,
            accept_task,
            info_task,
            _firmware: PhantomData,
        })
    }

    /// The control endpoint.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The control endpoint's port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// The identification endpoint.
    pub fn info_addr(&self) -> SocketAddr {
        self.info_addr
    }

    /// What the set is currently doing.
    pub fn state(&self) -> TvState {
        self.device.state()
    }

    /// The current settings.
    pub fn config(&self) -> SimConfig {
        self.device.config()
    }

    /// Changes the settings. Applies to frames received from now on.
    pub fn update_config(&self, f: impl FnOnce(&mut SimConfig)) {
        f(&mut lock(&self.device.config));
    }

    /// Forgets every issued credential, as if the user revoked access.
    pub fn forget_credentials(&self) {
        lock(&self.device.credentials).clear();
    }

    /// Every frame clients have sent, oldest first.
    pub fn frames(&self) -> Vec<Value> {
        lock(&self.device.frames).clone()
    }

    /// Frames whose top-level `field` equals `value`.
    pub fn frames_where(&self, field: &str, value: &str) -> Vec<Value> {
        self.frames()
            .into_iter()
            .filter(|f| f.get(field).and_then(Value::as_str) == Some(value))
            .collect()
    }

    /// How many connections were accepted in total.
    pub fn connections(&self) -> usize {
        self.device.accepted.load(Ordering::SeqCst)
    }

    /// How many connections are open right now.
    pub fn open_connections(&self) -> usize {
        lock(&self.device.links).len()
    }

    /// Closes every open connection from the set's side.
    pub async fn drop_connections(&self) {
        let links: Vec<Arc<ServerConnection>> =
            lock(&self.device.links).drain().map(|(_, c)| c).collect();
        tracing::info!(vendor = F::VENDOR, count = links.len(), "dropping connections");
        for conn in links {
            let _ = conn.close().await;
        }
    }
}

impl<F: Firmware> Drop for FakeTv<F> {
    fn drop(&mut self) {
        self.accept_task.abort();
        self.info_task.abort();
        lock(&self.device.links).clear();
    }
}

async fn identify<F: Firmware>(
    State((firmware, device)): State<(Arc<F>, Arc<Device>)>,
) -> Json<Value> {
    Json(firmware.identify(&device.config().name, &device.state()))
}

async fn accept_loop<F: Firmware>(
    mut transport: WebSocketTransport,
    firmware: Arc<F>,
    device: Arc<Device>,
) {
    let mut connections = JoinSet::new();
    loop {
        match transport.accept().await {
            Ok(conn) => {
                let conn = Arc::new(conn);
                device.accepted.fetch_add(1, Ordering::SeqCst);
                lock(&device.links).insert(conn.id(), Arc::clone(&conn));
                tracing::debug!(vendor = F::VENDOR, id = %conn.id(), "client connected");
                connections.spawn(serve(conn, Arc::clone(&firmware), Arc::clone(&device)));
            }
            Err(e) => tracing::warn!(vendor = F::VENDOR, error = %e, "accept failed"),
        }
        while connections.try_join_next().is_some() {}
    }
}

async fn serve<F: Firmware>(conn: Arc<ServerConnection>, firmware: Arc<F>, device: Arc<Device>) {
    let id = conn.id();
    let mut in_flight = JoinSet::new();

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(%id, error = %e, "receive failed");
                break;
            }
        };
        let frame: Value = match serde_json::from_slice(&data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%id, error = %e, "ignoring non-JSON frame");
                continue;
            }
        };
        lock(&device.frames).push(frame.clone());

        let config = device.config();
        if config.silent {
            continue;
        }
        let replies = if roll(config.error_rate) {
            tracing::debug!(%id, "injecting fault");
            vec![Reply::now(firmware.fault(&frame))]
        } else {
            firmware.respond(&frame, &device)
        };
        if replies.is_empty() {
            continue;
        }

        let delay = jitter(config.network_delay);
        let conn = Arc::clone(&conn);
        in_flight.spawn(async move {
            tokio::time::sleep(delay).await;
            for reply in replies {
                tokio::time::sleep(reply.delay).await;
                let Ok(bytes) = serde_json::to_vec(&reply.frame) else {
                    continue;
                };
                if conn.send(&bytes).await.is_err() {
                    break;
                }
            }
        });
        while in_flight.try_join_next().is_some() {}
    }

    lock(&device.links).remove(&id);
    tracing::debug!(%id, "client disconnected");
}

fn roll(probability: f64) -> bool {
    probability > 0.0 && rand::rng().random_bool(probability.min(1.0))
}

fn jitter((min, max): (Duration, Duration)) -> Duration {
    if max <= min {
        return min;
    }
    let min_ms = min.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_zero_never_fires() {
        assert!((0..1000).all(|_| !roll(0.0)));
    }

    #[test]
    fn test_roll_one_always_fires() {
        assert!((0..100).all(|_| roll(1.0)));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let range = (Duration::from_millis(50), Duration::from_millis(200));
        for _ in 0..200 {
            let d = jitter(range);
            assert!(d >= range.0 && d <= range.1, "{d:?} out of range");
        }
    }

    #[test]
    fn test_jitter_degenerate_range_returns_min() {
        let d = Duration::from_millis(20);
        assert_eq!(jitter((d, d)), d);
    }

    #[test]
    fn test_issue_credential_is_remembered() {
        let device = Device::new(SimConfig::reliable());
        let key = device.issue_credential("fake_client_key_");
        assert!(key.starts_with("fake_client_key_"));
        assert!(device.knows_credential(&key));
        assert!(!device.knows_credential("fake_client_key_other"));
    }
}
