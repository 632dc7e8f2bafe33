//! Session actor: an isolated Tokio task that owns one device's socket.
//!
//! Everything that mutates a session (state, generation, the socket, the
//! pending-request queue) happens inside this task, so no locking is
//! needed. The outside world talks to it through a [`SessionHandle`].
//!
//! The actor also spawns short-lived helper tasks: the connect attempt,
//! the socket reader, and timers. They never touch session state; they
//! post an [`Event`] back to the actor, tagged with the generation they
//! were started under. An event from an older generation is dropped, so a
//! late callback from a dead socket can't disturb the one that replaced it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tvlink_protocol::{Ack, Command, DeviceAddress, InboundEvent, ProtocolAdapter};
use tvlink_transport::{Connection, Connector};

use crate::credentials::CredentialSlot;
use crate::{
    CredentialStore, FailureReason, SessionConfig, SessionError, SessionState,
    SessionStatus,
};

type Reply = oneshot::Sender<Result<Ack, SessionError>>;

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    /// Start connecting if idle.
    Connect,

    /// Deliver a command, queueing it until the session is ready.
    Request {
        command: Command,
        timeout: Duration,
        reply: Reply,
    },

    /// Fail everything pending, close the socket, and stop.
    Shutdown { reply: oneshot::Sender<()> },
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => f.write_str("Connect"),
            Self::Request { command, .. } => {
                f.debug_struct("Request").field("command", command).finish()
            }
            Self::Shutdown { .. } => f.write_str("Shutdown"),
        }
    }
}

/// Messages from the actor's own helper tasks.
enum Event<T> {
    Opened {
        generation: u64,
        result: Result<T, String>,
    },
    Frame {
        generation: u64,
        data: Vec<u8>,
    },
    Closed {
        generation: u64,
        reason: String,
    },
    PairingTimeout {
        generation: u64,
    },
    RetryDue {
        generation: u64,
    },
    /// Per-request deadline. Not generation-tagged: a queued request
    /// survives reconnects.
    RequestExpired {
        seq: u64,
    },
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to a running session actor.
///
/// Cheap to clone. When the last handle is dropped the actor shuts the
/// session down on its own.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    address: DeviceAddress,
    adapter: Arc<dyn ProtocolAdapter>,
    sender: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    /// The device this session talks to.
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// The vendor adapter chosen for this device.
    pub fn adapter(&self) -> &Arc<dyn ProtocolAdapter> {
        &self.adapter
    }

    /// The latest status snapshot.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// A receiver that wakes on every status change.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Asks the session to start connecting.
    ///
    /// A no-op if it is already connecting, pairing, ready, or waiting out
    /// a retry backoff.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Connect)
            .await
            .map_err(|_| self.closed())
    }

    /// Waits until the session is ready, connecting it first if needed.
    ///
    /// Many callers may wait on one session at once; they are all woken
    /// by the same transition.
    ///
    /// # Errors
    /// - [`SessionError::Auth`]: the device rejected pairing while we
    ///   waited
    /// - [`SessionError::Connect`]: no socket could be opened before the
    ///   deadline, including a dial still pending when it passed
    /// - [`SessionError::Timeout`]: a socket opened but pairing did not
    ///   finish before the deadline
    /// - [`SessionError::SessionClosed`]: the session was shut down
    pub async fn ensure_ready(&self, deadline: Duration) -> Result<(), SessionError> {
        let mut status = self.status.clone();
        let baseline = status.borrow_and_update().clone();
        if baseline.state == SessionState::Ready {
            return Ok(());
        }
        if baseline.state.is_terminal() {
            return Err(self.closed());
        }

        self.connect().await?;

        let wait = async {
            loop {
                status.changed().await.map_err(|_| self.closed())?;
                let current = status.borrow_and_update().clone();
                if current.state == SessionState::Ready {
                    return Ok(());
                }
                if current.state.is_terminal() {
                    return Err(self.closed());
                }
                if current.auth_failures > baseline.auth_failures {
                    return Err(SessionError::Auth {
                        address: self.address.clone(),
                        reason: describe(current.last_failure.as_ref()),
                    });
                }
            }
        };

        match tokio::time::timeout(deadline, wait).await {
            Ok(result) => result,
            Err(_) => {
                let current = self.status();
                // No socket opened while we waited and none is open now,
                // whether the dial failed or is still hanging.
                let never_opened = current.sockets_opened == baseline.sockets_opened
                    && matches!(
                        current.state,
                        SessionState::Connecting | SessionState::Disconnected
                    );
                if never_opened {
                    Err(SessionError::Connect {
                        address: self.address.clone(),
                        reason: describe(current.last_failure.as_ref()),
                    })
                } else {
                    Err(SessionError::Timeout(self.address.clone()))
                }
            }
        }
    }

    /// Sends a command and waits for its acknowledgement.
    ///
    /// If the session isn't ready yet the command is queued and written,
    /// in submission order, as soon as it is. `timeout` covers the whole
    /// wait. Fire-and-forget commands resolve to [`Ack::sent`] right after
    /// the write.
    ///
    /// # Errors
    /// - [`SessionError::Timeout`]: still queued when `timeout` elapsed
    /// - [`SessionError::CommandTimeout`]: written, but no response
    /// - [`SessionError::SessionClosed`]: shut down, or the socket died
    ///   after the command was written
    /// - [`SessionError::Protocol`]: the command is not supported
    pub async fn request(
        &self,
        command: Command,
        timeout: Duration,
    ) -> Result<Ack, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Request {
                command,
                timeout,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.closed())?;
        reply_rx.await.map_err(|_| self.closed())?
    }

    /// Shuts the session down and waits until its socket is closed.
    ///
    /// Idempotent: shutting down a stopped session does nothing.
    pub async fn shutdown(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .sender
            .send(SessionCommand::Shutdown { reply: reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
    }

    fn closed(&self) -> SessionError {
        SessionError::SessionClosed(self.address.clone())
    }
}

fn describe(failure: Option<&FailureReason>) -> String {
    failure.map_or_else(|| "connect still pending".to_owned(), ToString::to_string)
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// A command waiting for the session to become ready.
struct Pending {
    seq: u64,
    command: Command,
    reply: Reply,
    created: Instant,
    timer: JoinHandle<()>,
}

/// A command written to the socket, waiting for its correlated response.
struct InFlight {
    seq: u64,
    command: String,
    reply: Reply,
    timer: JoinHandle<()>,
}

struct SessionActor<C: Connector> {
    address: DeviceAddress,
    adapter: Arc<dyn ProtocolAdapter>,
    connector: Arc<C>,
    config: SessionConfig,
    credential: CredentialSlot,
    commands: mpsc::Receiver<SessionCommand>,
    events_tx: mpsc::UnboundedSender<Event<C::Connection>>,
    events: mpsc::UnboundedReceiver<Event<C::Connection>>,
    status: watch::Sender<SessionStatus>,

    state: SessionState,
    generation: u64,
    conn: Option<Arc<C::Connection>>,
    connect_task: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    pairing_timer: Option<JoinHandle<()>>,
    retry_timer: Option<JoinHandle<()>>,
    queue: VecDeque<Pending>,
    in_flight: HashMap<String, InFlight>,
    next_seq: u64,
}

impl<C: Connector> SessionActor<C> {
    async fn run(mut self) {
        tracing::debug!(address = %self.address, "session actor started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Connect) => self.handle_connect().await,
                    Some(SessionCommand::Request { command, timeout, reply }) => {
                        self.handle_request(command, timeout, reply).await;
                    }
                    Some(SessionCommand::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    // Every handle is gone.
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.handle_event(event).await,
            }
        }

        tracing::debug!(address = %self.address, "session actor stopped");
    }

    // -- commands ---------------------------------------------------------

    async fn handle_connect(&mut self) {
        if self.state == SessionState::Disconnected && self.retry_timer.is_none() {
            self.begin_connect().await;
        }
    }

    async fn handle_request(&mut self, command: Command, timeout: Duration, reply: Reply) {
        if let Err(e) = self.adapter.validate(&command) {
            let _ = reply.send(Err(e.into()));
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let pending = Pending {
            seq,
            command,
            reply,
            created: Instant::now(),
            timer: self.spawn_timer(timeout, Event::RequestExpired { seq }),
        };

        if self.state == SessionState::Ready {
            self.transmit(pending).await;
            return;
        }

        self.queue.push_back(pending);
        tracing::debug!(
            address = %self.address,
            state = %self.state,
            queued = self.queue.len(),
            "command queued until ready"
        );
        self.handle_connect().await;
    }

    // -- events -----------------------------------------------------------

    async fn handle_event(&mut self, event: Event<C::Connection>) {
        match event {
            Event::Opened { generation, result } => self.on_opened(generation, result).await,
            Event::Frame { generation, data } => {
                if self.is_current(generation, "frame") {
                    self.on_frame(&data).await;
                }
            }
            Event::Closed { generation, reason } => {
                if self.is_current(generation, "close") && self.conn.is_some() {
                    self.connection_lost(FailureReason::Closed(reason)).await;
                }
            }
            Event::PairingTimeout { generation } => {
                if self.is_current(generation, "pairing timeout")
                    && self.state == SessionState::AwaitingPairing
                {
                    self.pairing_timer = None;
                    tracing::warn!(
                        address = %self.address,
                        generation,
                        "device did not answer pairing in time"
                    );
                    let reason = format!(
                        "no pairing response within {:?}",
                        self.config.pairing_timeout
                    );
                    self.connection_lost(FailureReason::Pairing(reason)).await;
                }
            }
            Event::RetryDue { generation } => {
                if self.is_current(generation, "retry")
                    && self.state == SessionState::Disconnected
                {
                    self.retry_timer = None;
                    self.begin_connect().await;
                }
            }
            Event::RequestExpired { seq } => self.expire_request(seq),
        }
    }

    fn is_current(&self, generation: u64, what: &'static str) -> bool {
        if generation == self.generation {
            return true;
        }
        tracing::debug!(
            address = %self.address,
            generation,
            current = self.generation,
            "ignoring stale {what}"
        );
        false
    }

    async fn on_opened(&mut self, generation: u64, result: Result<C::Connection, String>) {
        if generation != self.generation || self.state != SessionState::Connecting {
            tracing::debug!(address = %self.address, generation, "ignoring stale connect result");
            if let Ok(conn) = result {
                let _ = conn.close().await;
            }
            return;
        }
        self.connect_task = None;

        let conn = match result {
            Ok(conn) => Arc::new(conn),
            Err(reason) => {
                tracing::warn!(address = %self.address, generation, %reason, "connect failed");
                self.status.send_modify(|s| {
                    s.connect_failures += 1;
                    s.last_failure = Some(FailureReason::Connect(reason));
                });
                self.set_state(SessionState::Disconnected);
                self.schedule_retry();
                return;
            }
        };

        tracing::info!(address = %self.address, generation, conn = %conn.id(), "connected, pairing");
        self.status.send_modify(|s| s.sockets_opened += 1);
        self.reader = Some(spawn_reader(
            Arc::clone(&conn),
            generation,
            self.events_tx.clone(),
        ));
        self.conn = Some(conn);
        self.set_state(SessionState::AwaitingPairing);

        let token = self.credential.get();
        let frame = match self.adapter.build_pairing_message(token.as_deref()) {
            Ok(frame) => frame,
            Err(e) => {
                self.connection_lost(FailureReason::Pairing(e.to_string())).await;
                return;
            }
        };
        if let Err(reason) = self.write(&frame.bytes).await {
            self.connection_lost(FailureReason::Closed(reason)).await;
            return;
        }
        self.pairing_timer = Some(self.spawn_timer(
            self.config.pairing_timeout,
            Event::PairingTimeout { generation },
        ));
    }

    async fn on_frame(&mut self, data: &[u8]) {
        let event = match self.adapter.parse_inbound(data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(address = %self.address, error = %e, "dropping unreadable frame");
                return;
            }
        };
        let auth_failure = event.is_auth_failure();

        match event {
            InboundEvent::PairingAccepted { token } => self.on_paired(token).await,
            InboundEvent::CommandAck {
                request_id,
                ok,
                detail,
                payload,
            } => self.complete(request_id, Ack { ok, detail, payload }),
            InboundEvent::Error {
                code,
                message,
                request_id,
            } => {
                self.on_device_error(code, message, request_id, auth_failure)
                    .await;
            }
            InboundEvent::Unrecognized => {
                tracing::debug!(address = %self.address, "ignoring unrecognized frame");
            }
        }
    }

    async fn on_paired(&mut self, token: Option<String>) {
        if let Some(token) = token {
            self.credential.set(token);
        }
        if self.state != SessionState::AwaitingPairing {
            tracing::debug!(address = %self.address, state = %self.state, "extra pairing confirmation");
            return;
        }

        if let Some(timer) = self.pairing_timer.take() {
            timer.abort();
        }
        self.set_state(SessionState::Ready);
        tracing::info!(
            address = %self.address,
            generation = self.generation,
            queued = self.queue.len(),
            "paired"
        );

        while self.state == SessionState::Ready {
            let Some(pending) = self.queue.pop_front() else {
                break;
            };
            self.transmit(pending).await;
        }
    }

    fn complete(&mut self, request_id: Option<String>, ack: Ack) {
        let Some(request_id) = request_id else {
            tracing::debug!(address = %self.address, ok = ack.ok, "uncorrelated ack");
            return;
        };
        match self.in_flight.remove(&request_id) {
            Some(flight) => {
                flight.timer.abort();
                let _ = flight.reply.send(Ok(ack));
            }
            None => {
                tracing::debug!(address = %self.address, %request_id, "response for unknown request");
            }
        }
    }

    async fn on_device_error(
        &mut self,
        code: Option<u16>,
        message: String,
        request_id: Option<String>,
        auth_failure: bool,
    ) {
        if let Some(flight) = request_id.as_ref().and_then(|id| self.in_flight.remove(id)) {
            flight.timer.abort();
            let _ = flight.reply.send(Ok(Ack::rejected(message)));
            return;
        }

        match self.state {
            SessionState::AwaitingPairing if auth_failure => {
                tracing::warn!(address = %self.address, ?code, %message, "pairing rejected, clearing credential");
                self.revoke_credential(message).await;
            }
            SessionState::AwaitingPairing => {
                tracing::warn!(address = %self.address, ?code, %message, "pairing failed");
                self.connection_lost(FailureReason::Pairing(message)).await;
            }
            SessionState::Ready if auth_failure => {
                tracing::warn!(address = %self.address, ?code, %message, "credential revoked by device");
                self.revoke_credential(message).await;
            }
            _ => {
                tracing::debug!(address = %self.address, ?code, %message, "device error");
            }
        }
    }

    async fn revoke_credential(&mut self, message: String) {
        self.credential.clear();
        self.status.send_modify(|s| s.auth_failures += 1);
        self.connection_lost(FailureReason::Auth(message)).await;
    }

    fn expire_request(&mut self, seq: u64) {
        if let Some(pos) = self.queue.iter().position(|p| p.seq == seq) {
            if let Some(pending) = self.queue.remove(pos) {
                tracing::debug!(address = %self.address, command = %pending.command.name, "queued command timed out");
                let _ = pending
                    .reply
                    .send(Err(SessionError::Timeout(self.address.clone())));
            }
            return;
        }

        let request_id = self
            .in_flight
            .iter()
            .find(|(_, flight)| flight.seq == seq)
            .map(|(id, _)| id.clone());
        if let Some(flight) = request_id.and_then(|id| self.in_flight.remove(&id)) {
            tracing::debug!(address = %self.address, command = %flight.command, "no response to command");
            let _ = flight.reply.send(Err(SessionError::CommandTimeout {
                address: self.address.clone(),
                command: flight.command,
            }));
        }
    }

    // -- transitions ------------------------------------------------------

    async fn begin_connect(&mut self) {
        self.drop_socket().await;
        self.generation += 1;
        self.set_state(SessionState::Connecting);

        let generation = self.generation;
        let url = self.adapter.endpoint(&self.address.host);
        let connector = Arc::clone(&self.connector);
        let events = self.events_tx.clone();
        let limit = self.config.connect_timeout;
        tracing::debug!(address = %self.address, generation, %url, "connecting");

        self.connect_task = Some(tokio::spawn(async move {
            let result = match tokio::time::timeout(limit, connector.connect(&url)).await {
                Ok(Ok(conn)) => Ok(conn),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("timed out after {limit:?}")),
            };
            let _ = events.send(Event::Opened { generation, result });
        }));
    }

    /// Drops the socket and schedules a reconnect.
    async fn connection_lost(&mut self, reason: FailureReason) {
        tracing::info!(address = %self.address, generation = self.generation, %reason, "disconnected");
        self.drop_socket().await;

        for (_, flight) in self.in_flight.drain() {
            flight.timer.abort();
            let _ = flight
                .reply
                .send(Err(SessionError::SessionClosed(self.address.clone())));
        }

        let staleness = self.config.queue_staleness;
        let (stale, fresh): (VecDeque<_>, VecDeque<_>) = self
            .queue
            .drain(..)
            .partition(|p| p.created.elapsed() > staleness);
        self.queue = fresh;
        for pending in stale {
            tracing::warn!(address = %self.address, command = %pending.command.name, "dropping stale queued command");
            pending.timer.abort();
            let _ = pending
                .reply
                .send(Err(SessionError::Timeout(self.address.clone())));
        }

        self.generation += 1;
        self.status.send_modify(|s| s.last_failure = Some(reason));
        self.set_state(SessionState::Disconnected);
        self.schedule_retry();
    }

    async fn shutdown(&mut self) {
        tracing::info!(address = %self.address, "session shutting down");
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
        self.drop_socket().await;

        for pending in self.queue.drain(..) {
            pending.timer.abort();
            let _ = pending
                .reply
                .send(Err(SessionError::SessionClosed(self.address.clone())));
        }
        for (_, flight) in self.in_flight.drain() {
            flight.timer.abort();
            let _ = flight
                .reply
                .send(Err(SessionError::SessionClosed(self.address.clone())));
        }

        self.generation += 1;
        self.set_state(SessionState::Shutdown);
    }

    // -- helpers ----------------------------------------------------------

    async fn transmit(&mut self, pending: Pending) {
        if pending.reply.is_closed() {
            tracing::debug!(address = %self.address, command = %pending.command.name, "caller gone, not sending");
            pending.timer.abort();
            return;
        }

        let token = self.credential.get();
        let frame = match self
            .adapter
            .build_command_message(&pending.command, token.as_deref())
        {
            Ok(frame) => frame,
            Err(e) => {
                pending.timer.abort();
                let _ = pending.reply.send(Err(e.into()));
                return;
            }
        };

        if let Err(reason) = self.write(&frame.bytes).await {
            pending.timer.abort();
            let _ = pending
                .reply
                .send(Err(SessionError::SessionClosed(self.address.clone())));
            self.connection_lost(FailureReason::Closed(reason)).await;
            return;
        }

        match frame.request_id {
            Some(request_id) => {
                tracing::debug!(address = %self.address, %request_id, command = %pending.command.name, "command sent");
                self.in_flight.insert(
                    request_id,
                    InFlight {
                        seq: pending.seq,
                        command: pending.command.name,
                        reply: pending.reply,
                        timer: pending.timer,
                    },
                );
            }
            None => {
                tracing::debug!(address = %self.address, command = %pending.command.name, "command sent, no response expected");
                pending.timer.abort();
                let _ = pending.reply.send(Ok(Ack::sent()));
            }
        }
    }

    /// Writes one frame. The actor is the only writer, so frames never
    /// interleave.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), String> {
        let Some(conn) = self.conn.clone() else {
            return Err("no open socket".into());
        };
        match tokio::time::timeout(self.config.write_timeout, conn.send(bytes)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("write timed out".into()),
        }
    }

    /// Stops the reader and pairing timer and closes the socket, if any.
    async fn drop_socket(&mut self) {
        let tasks = [
            self.reader.take(),
            self.pairing_timer.take(),
            self.connect_task.take(),
        ];
        for task in tasks.into_iter().flatten() {
            task.abort();
        }

        if let Some(conn) = self.conn.take() {
            match tokio::time::timeout(self.config.write_timeout, conn.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!(address = %self.address, error = %e, "close failed");
                }
                Err(_) => {
                    tracing::debug!(address = %self.address, "close timed out");
                }
            }
        }
    }

    fn schedule_retry(&mut self) {
        let generation = self.generation;
        self.retry_timer = Some(self.spawn_timer(
            self.config.reconnect_backoff,
            Event::RetryDue { generation },
        ));
    }

    fn spawn_timer(&self, delay: Duration, event: Event<C::Connection>) -> JoinHandle<()> {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        })
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        let generation = self.generation;
        self.status.send_modify(|s| {
            s.state = state;
            s.generation = generation;
        });
    }
}

/// Forwards every received frame to the actor until the socket closes.
fn spawn_reader<T: Connection>(
    conn: Arc<T>,
    generation: u64,
    events: mpsc::UnboundedSender<Event<T>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reason = loop {
            match conn.recv().await {
                Ok(Some(data)) => {
                    if events.send(Event::Frame { generation, data }).is_err() {
                        return;
                    }
                }
                Ok(None) => break "closed by device".to_owned(),
                Err(e) => break e.to_string(),
            }
        };
        let _ = events.send(Event::Closed { generation, reason });
    })
}

/// Spawns a session actor for `address` and returns a handle to it.
///
/// The session starts `Disconnected` and does not connect until asked
/// ([`SessionHandle::connect`], [`ensure_ready`](SessionHandle::ensure_ready),
/// or the first [`request`](SessionHandle::request)). It reads and writes
/// only its own entry in `credentials`.
pub fn spawn_session<C: Connector>(
    address: DeviceAddress,
    adapter: Arc<dyn ProtocolAdapter>,
    connector: Arc<C>,
    credentials: &CredentialStore,
    config: SessionConfig,
) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_size.max(1));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(SessionStatus::default());

    let actor = SessionActor {
        address: address.clone(),
        adapter: Arc::clone(&adapter),
        connector,
        config,
        credential: credentials.slot(address.clone()),
        commands: cmd_rx,
        events_tx,
        events: events_rx,
        status: status_tx,
        state: SessionState::Disconnected,
        generation: 0,
        conn: None,
        connect_task: None,
        reader: None,
        pairing_timer: None,
        retry_timer: None,
        queue: VecDeque::new(),
        in_flight: HashMap::new(),
        next_seq: 0,
    };

    tokio::spawn(actor.run());

    SessionHandle {
        address,
        adapter,
        sender: cmd_tx,
        status: status_rx,
    }
}
