//! A scripted in-memory connector for driving sessions in tests.
//!
//! `MockConnector` hands out `MockConnection`s whose "device" side is a
//! responder closure: every frame the session writes is recorded and fed
//! to the responder, which returns the frames the device sends back.
//! The connector also counts open sockets per URL so tests can check
//! that a session never holds two at once.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tvlink_transport::{Connection, ConnectionId, Connector, TransportError};

/// A frame the fake device sends back after `delay`.
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

pub type Responder = Arc<dyn Fn(&Value) -> Vec<Reply> + Send + Sync>;

type Link = mpsc::UnboundedSender<Option<Vec<u8>>>;

struct MockState {
    responder: Responder,
    fail_connects: usize,
    hang_connects: bool,
    close_delay: Duration,
    connects: usize,
    open: HashMap<String, usize>,
    max_open: HashMap<String, usize>,
    frames: Vec<Value>,
    links: HashMap<u64, Link>,
}

#[derive(Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl MockConnector {
    pub fn new(responder: Responder) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                responder,
                fail_connects: 0,
                hang_connects: false,
                close_delay: Duration::ZERO,
                connects: 0,
                open: HashMap::new(),
                max_open: HashMap::new(),
                frames: Vec::new(),
                links: HashMap::new(),
            })),
        }
    }

    /// The next `n` connect attempts fail.
    pub fn fail_next_connects(&self, n: usize) {
        self.state.lock().unwrap().fail_connects = n;
    }

    /// Connect attempts never complete, like a black-holed host.
    pub fn hang_connects(&self) {
        self.state.lock().unwrap().hang_connects = true;
    }

    /// Client-side `close()` takes this long before the socket is released.
    pub fn set_close_delay(&self, delay: Duration) {
        self.state.lock().unwrap().close_delay = delay;
    }

    pub fn set_responder(&self, responder: Responder) {
        self.state.lock().unwrap().responder = responder;
    }

    /// Closes every live socket from the device side.
    pub fn drop_connections(&self) {
        let links: Vec<Link> = self.state.lock().unwrap().links.drain().map(|(_, l)| l).collect();
        for link in links {
            let _ = link.send(None);
        }
    }

    /// Sends an unsolicited frame on every live socket.
    pub fn push(&self, frame: Value) {
        let bytes = serde_json::to_vec(&frame).unwrap();
        for link in self.state.lock().unwrap().links.values() {
            let _ = link.send(Some(bytes.clone()));
        }
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn open_sockets(&self) -> usize {
        self.state.lock().unwrap().open.values().sum()
    }

    /// The most sockets ever open at once to any single URL.
    pub fn max_open_per_url(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .max_open
            .values()
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Every frame the client has written, oldest first.
    pub fn frames(&self) -> Vec<Value> {
        self.state.lock().unwrap().frames.clone()
    }

    /// Frames whose `field` equals `value`.
    pub fn frames_where(&self, field: &str, value: &str) -> Vec<Value> {
        self.frames()
            .into_iter()
            .filter(|f| f.get(field).and_then(Value::as_str) == Some(value))
            .collect()
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self, url: &str) -> Result<MockConnection, TransportError> {
        let hang = self.state.lock().unwrap().hang_connects;
        if hang {
            std::future::pending::<()>().await;
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(TransportError::ConnectFailed {
                url: url.to_owned(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "scripted failure"),
            });
        }

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        state.connects += 1;
        state.links.insert(id, tx.clone());
        let open = state.open.entry(url.to_owned()).or_default();
        *open += 1;
        let open = *open;
        let max = state.max_open.entry(url.to_owned()).or_default();
        *max = (*max).max(open);

        Ok(MockConnection {
            id: ConnectionId::new(id),
            url: url.to_owned(),
            inbound: tokio::sync::Mutex::new(rx),
            to_self: tx,
            closed: AtomicBool::new(false),
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MockConnection {
    id: ConnectionId,
    url: String,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Option<Vec<u8>>>>,
    to_self: Link,
    closed: AtomicBool,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn release(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.links.remove(&self.id.into_inner());
        if let Some(open) = state.open.get_mut(&self.url) {
            *open -= 1;
        }
    }
}

impl Connection for MockConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "socket closed",
            )));
        }
        let frame: Value = serde_json::from_slice(data).unwrap();
        let responder = {
            let mut state = self.state.lock().unwrap();
            state.frames.push(frame.clone());
            Arc::clone(&state.responder)
        };

        let replies = responder(&frame);
        let tx = self.to_self.clone();
        if replies.iter().all(|r| r.delay.is_zero()) {
            for reply in replies {
                let _ = tx.send(Some(serde_json::to_vec(&reply.frame).unwrap()));
            }
        } else {
            tokio::spawn(async move {
                for reply in replies {
                    tokio::time::sleep(reply.delay).await;
                    let _ = tx.send(Some(serde_json::to_vec(&reply.frame).unwrap()));
                }
            });
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(Some(data)) => Ok(Some(data)),
            _ => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let delay = self.state.lock().unwrap().close_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.release();
        let _ = self.to_self.send(None);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Canned devices
// ---------------------------------------------------------------------------

fn id_of(frame: &Value) -> Value {
    frame.get("id").cloned().unwrap_or(Value::Null)
}

/// A WebOS set that issues `key` after `pairing_delay` and answers every
/// request with `returnValue: true`.
pub fn webos_tv(key: &'static str, pairing_delay: Duration) -> Responder {
    Arc::new(move |frame: &Value| match frame["type"].as_str() {
        Some("register") => vec![Reply::after(
            pairing_delay,
            json!({ "type": "registered", "id": id_of(frame), "payload": { "client-key": key } }),
        )],
        Some("request") if frame.get("id").is_some() => vec![Reply::now(json!({
            "type": "response",
            "id": id_of(frame),
            "payload": { "returnValue": true }
        }))],
        _ => vec![],
    })
}

/// A WebOS set that pairs but never answers requests.
pub fn webos_tv_mute(key: &'static str) -> Responder {
    Arc::new(move |frame: &Value| match frame["type"].as_str() {
        Some("register") => vec![Reply::now(
            json!({ "type": "registered", "id": id_of(frame), "payload": { "client-key": key } }),
        )],
        _ => vec![],
    })
}

/// A Samsung set that issues `token` (or echoes the presented one) and
/// never acknowledges key presses.
pub fn samsung_tv(token: &'static str) -> Responder {
    Arc::new(move |frame: &Value| match frame["method"].as_str() {
        Some("ms.channel.connect") => {
            let issued = frame["params"]["token"]
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| token.to_owned());
            vec![Reply::now(
                json!({ "event": "ms.channel.connect", "data": { "token": issued } }),
            )]
        }
        _ => vec![],
    })
}

/// A device that never says anything.
pub fn silent_tv() -> Responder {
    Arc::new(|_: &Value| vec![])
}

/// Answers Samsung frames as `samsung_tv("T1")` and everything else as
/// `webos_tv("K1", webos_pairing_delay)`, for tests mixing both vendors on
/// one connector.
pub fn mixed_tv(webos_pairing_delay: Duration) -> Responder {
    let samsung = samsung_tv("T1");
    let webos = webos_tv("K1", webos_pairing_delay);
    Arc::new(move |frame: &Value| {
        if frame.get("method").is_some() {
            samsung(frame)
        } else {
            webos(frame)
        }
    })
}
