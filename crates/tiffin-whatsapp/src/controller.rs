// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle controller.
//!
//! A single actor task owns the connection state, the attempt counter, the
//! pairing token, and the retry/expiry timers. Everything that can change
//! that state (operator starts, transport events, connect results, timer
//! firings) arrives as a [`Command`] on one channel, so transitions are
//! strictly serialized.
//!
//! A stall watchdog bounds the time spent in `Initializing` and
//! `Authenticated`. If the remote goes quiet there, the cycle counts as a
//! failed attempt, so the start guard is always released eventually.
//!
//! Each connection attempt gets a generation number. Events and connect
//! results tagged with an older generation are dropped, which keeps a torn
//! down handle from driving the new cycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tiffin_bus::EventBus;
use tiffin_config::model::WhatsAppConfig;
use tiffin_core::{
    ConnectRequest, ConnectionRecord, ConnectionState, DisconnectReason, InboundMessage,
    MessageSender, PairingToken, SessionStore, TiffinError, TransportConnector, TransportEvent,
    TransportHandle,
};
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::inbound::InboundDispatcher;
use crate::metrics;
use crate::pairing::{self, PairingChannel};
use crate::scheduler::ScheduledTask;
use crate::session_blob::SessionBlob;

/// Upper bound on a graceful shutdown of a stale handle.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport events buffered per connection attempt.
const EVENT_BUFFER: usize = 64;

/// Tunables for the controller.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub client_id: String,
    pub session_dir: PathBuf,
    /// Consecutive failures before automatic retries halt.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub pairing_ttl: Duration,
    pub init_timeout: Duration,
}

impl ControllerSettings {
    pub fn from_config(config: &WhatsAppConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            session_dir: PathBuf::from(&config.session_dir),
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
            pairing_ttl: config.pairing_ttl(),
            init_timeout: config.init_timeout(),
        }
    }
}

/// Collaborators the controller is wired to.
pub struct ControllerDeps {
    pub connector: Arc<dyn TransportConnector>,
    pub store: Arc<dyn SessionStore>,
    pub bus: EventBus,
    /// Receives every inbound chat message. `None` drops them.
    pub inbound: Option<Arc<InboundDispatcher>>,
}

/// Result of a `start` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Another cycle holds the start guard; the request was a no-op.
    AlreadyInProgress,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerSnapshot {
    pub state: ConnectionState,
    /// Automatic retries are exhausted; only a manual start resumes.
    pub halted: bool,
    /// Consecutive failures in the current cycle.
    pub attempts: u32,
    /// The start guard is held.
    pub starting: bool,
    /// Rendered pairing code while one is live.
    pub pairing_image: Option<String>,
    pub last_authenticated_at: Option<DateTime<Utc>>,
}

enum Command {
    Start {
        force_new: bool,
        reply: oneshot::Sender<StartOutcome>,
    },
    InitResult {
        generation: u64,
        result: Result<Box<dyn TransportHandle>, TiffinError>,
    },
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    RetryFired {
        id: u64,
    },
    PairingExpired {
        token_id: u64,
    },
    StallFired {
        id: u64,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

type SharedHandle = Arc<RwLock<Option<Arc<dyn TransportHandle>>>>;

/// Cloneable handle to the controller actor.
///
/// Besides the administrative [`start`](Self::start) trigger it implements
/// [`MessageSender`], the only surface the scheduler and router get.
#[derive(Clone)]
pub struct ConnectionController {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<ControllerSnapshot>,
    handle: SharedHandle,
    store: Arc<dyn SessionStore>,
}

impl ConnectionController {
    /// Spawns the actor. It runs until `cancel` fires or
    /// [`shutdown`](Self::shutdown) is called.
    pub fn spawn(
        settings: ControllerSettings,
        deps: ControllerDeps,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ControllerSnapshot::default());
        let handle: SharedHandle = Arc::new(RwLock::new(None));

        let controller = Self {
            commands: commands.clone(),
            snapshot: snapshot_rx,
            handle: handle.clone(),
            store: deps.store.clone(),
        };

        let actor = Actor {
            blob: SessionBlob::new(settings.session_dir.clone(), settings.client_id.clone()),
            pairing: PairingChannel::new(settings.pairing_ttl),
            settings,
            connector: deps.connector,
            store: deps.store,
            bus: deps.bus,
            inbound: deps.inbound,
            commands,
            sender: controller.clone(),
            snapshot: snapshot_tx,
            handle,
            state: ConnectionState::Disconnected,
            halted: false,
            attempts: 0,
            starting: false,
            generation: 0,
            token: None,
            pairing_image: None,
            last_authenticated_at: None,
            retry: None,
            expiry: None,
            stall: None,
            next_task_id: 0,
        };
        let task = tokio::spawn(actor.run(rx, cancel));
        (controller, task)
    }

    /// Begins a connection cycle. With `force_new` the stored session blob
    /// is deleted first, forcing a fresh pairing.
    pub async fn start(&self, force_new: bool) -> Result<StartOutcome, TiffinError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Start { force_new, reply })
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    /// Starts the first cycle after a process restart.
    ///
    /// With no persisted record, or a persisted `disconnected` status, the
    /// session blob is discarded. Any other status reuses it.
    pub async fn resume(&self) -> Result<StartOutcome, TiffinError> {
        let record = match self.store.load().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "cannot read persisted connection status, forcing new session");
                None
            }
        };
        let force_new = record
            .map(|r| r.status == ConnectionState::Disconnected)
            .unwrap_or(true);
        info!(force_new, "resuming messaging connection");
        self.start(force_new).await
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot.borrow().state
    }

    /// Watch channel that updates after every processed command.
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot.clone()
    }

    /// Tears down the live connection and stops the actor.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }
}

#[async_trait]
impl MessageSender for ConnectionController {
    fn is_ready(&self) -> bool {
        self.snapshot.borrow().state == ConnectionState::Ready
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<(), TiffinError> {
        if !self.is_ready() {
            return Err(TiffinError::NotReady);
        }
        let handle = self.handle.read().await.clone();
        match handle {
            Some(handle) => handle.send_text(to, body).await,
            None => Err(TiffinError::NotReady),
        }
    }
}

fn stopped() -> TiffinError {
    TiffinError::Internal("connection controller has stopped".to_string())
}

struct Actor {
    settings: ControllerSettings,
    connector: Arc<dyn TransportConnector>,
    store: Arc<dyn SessionStore>,
    bus: EventBus,
    inbound: Option<Arc<InboundDispatcher>>,
    blob: SessionBlob,
    pairing: PairingChannel,
    commands: mpsc::UnboundedSender<Command>,
    sender: ConnectionController,
    snapshot: watch::Sender<ControllerSnapshot>,
    handle: SharedHandle,

    state: ConnectionState,
    halted: bool,
    attempts: u32,
    starting: bool,
    generation: u64,
    token: Option<PairingToken>,
    pairing_image: Option<String>,
    last_authenticated_at: Option<DateTime<Utc>>,
    retry: Option<ScheduledTask>,
    expiry: Option<ScheduledTask>,
    /// Armed while waiting on the remote in `Initializing` or `Authenticated`.
    stall: Option<ScheduledTask>,
    next_task_id: u64,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>, cancel: CancellationToken) {
        self.restore().await;
        loop {
            let command = tokio::select! {
                _ = cancel.cancelled() => break,
                command = rx.recv() => command,
            };
            match command {
                Some(Command::Shutdown { reply }) => {
                    self.stop().await;
                    let _ = reply.send(());
                    return;
                }
                Some(command) => self.handle(command).await,
                None => break,
            }
            self.publish_snapshot();
        }
        self.stop().await;
    }

    async fn restore(&mut self) {
        match self.store.load().await {
            Ok(Some(record)) => {
                debug!(status = %record.status, "loaded persisted connection status");
                self.last_authenticated_at = record.last_authenticated_at;
            }
            Ok(None) => debug!("no persisted connection status"),
            Err(e) => warn!(error = %e, "cannot read persisted connection status"),
        }
        self.publish_snapshot();
    }

    async fn stop(&mut self) {
        self.retry = None;
        self.clear_pairing();
        self.teardown().await;
        debug!("connection controller stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start { force_new, reply } => {
                let outcome = self.start(force_new).await;
                let _ = reply.send(outcome);
            }
            Command::InitResult { generation, result } => {
                self.on_init_result(generation, result).await;
            }
            Command::Transport { generation, event } => {
                if generation == self.generation {
                    self.on_transport_event(event).await;
                } else {
                    debug!(generation, current = self.generation, "dropping stale transport event");
                }
            }
            Command::RetryFired { id } => self.on_retry_fired(id).await,
            Command::PairingExpired { token_id } => self.on_pairing_expired(token_id).await,
            Command::StallFired { id } => self.on_stall_fired(id).await,
            Command::Shutdown { reply } => {
                // Handled in `run`; kept exhaustive.
                let _ = reply.send(());
            }
        }
    }

    // --- cycle control ---

    async fn start(&mut self, force_new: bool) -> StartOutcome {
        if self.starting {
            info!(force_new, "connection start already in progress, skipping");
            self.log("Initialization already in progress. Skipping call.");
            return StartOutcome::AlreadyInProgress;
        }
        self.starting = true;
        self.retry = None;
        if force_new {
            self.attempts = 0;
        }
        self.clear_pairing();
        self.teardown().await;

        if force_new {
            match self.blob.delete().await {
                Ok(true) => self.log("Deleted old session files."),
                Ok(false) => debug!(path = %self.blob.path().display(), "no session files to delete"),
                Err(e) => self.log(format!("Error deleting session files: {e}")),
            }
        }

        self.transition(ConnectionState::Initializing, false).await;
        self.log(format!(
            "Initializing WhatsApp client (force new session: {force_new}, failed attempts: {}/{}).",
            self.attempts, self.settings.max_attempts
        ));
        self.arm_stall();
        self.spawn_connect();
        StartOutcome::Started
    }

    fn spawn_connect(&self) {
        let generation = self.generation;
        let request = ConnectRequest {
            client_id: self.settings.client_id.clone(),
            session_dir: self.settings.session_dir.clone(),
        };
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);

        let forward = self.commands.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                if forward.send(Command::Transport { generation, event }).is_err() {
                    break;
                }
            }
        });

        let connector = self.connector.clone();
        let commands = self.commands.clone();
        let timeout = self.settings.init_timeout;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, connector.connect(request, events_tx))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(TiffinError::Timeout { duration: timeout }),
            };
            let _ = commands.send(Command::InitResult { generation, result });
        });
    }

    /// Drops the live handle, requesting a graceful shutdown. Failures are
    /// logged and never block the caller.
    async fn teardown(&mut self) {
        self.stall = None;
        self.generation += 1;
        let previous = self.handle.write().await.take();
        let Some(handle) = previous else {
            return;
        };
        self.log("Destroying previous client instance...");
        match tokio::time::timeout(TEARDOWN_TIMEOUT, handle.shutdown()).await {
            Ok(Ok(())) => debug!("previous client instance shut down"),
            Ok(Err(e)) => self.log(format!("Error destroying old client: {e}")),
            Err(_) => self.log("Timed out destroying old client."),
        }
    }

    /// Counts a failed attempt and either schedules a retry or halts.
    async fn record_failure(&mut self) {
        self.attempts += 1;
        let max = self.settings.max_attempts;
        self.starting = false;
        if self.attempts < max {
            self.transition(ConnectionState::Disconnected, false).await;
            self.schedule_retry();
            self.log(format!(
                "Retrying in {} seconds (attempt {}/{max}).",
                self.settings.retry_delay.as_secs(),
                self.attempts
            ));
        } else {
            warn!(attempts = self.attempts, max, "automatic reconnection halted");
            self.attempts = 0;
            self.transition(ConnectionState::Disconnected, true).await;
            self.log("Max reconnection attempts reached. Manual intervention needed.");
        }
    }

    fn schedule_retry(&mut self) {
        self.next_task_id += 1;
        let commands = self.commands.clone();
        self.retry = Some(ScheduledTask::schedule(
            self.next_task_id,
            self.settings.retry_delay,
            move |id| {
                let _ = commands.send(Command::RetryFired { id });
            },
        ));
        metrics::record_retry();
    }

    fn arm_expiry(&mut self, token_id: u64) {
        let commands = self.commands.clone();
        self.expiry = Some(ScheduledTask::schedule(
            token_id,
            self.pairing.ttl(),
            move |token_id| {
                let _ = commands.send(Command::PairingExpired { token_id });
            },
        ));
    }

    fn arm_stall(&mut self) {
        self.next_task_id += 1;
        let commands = self.commands.clone();
        self.stall = Some(ScheduledTask::schedule(
            self.next_task_id,
            self.settings.init_timeout,
            move |id| {
                let _ = commands.send(Command::StallFired { id });
            },
        ));
    }

    /// Discards the pairing token and cancels its expiry timer.
    fn clear_pairing(&mut self) {
        self.token = None;
        self.expiry = None;
    }

    async fn on_retry_fired(&mut self, id: u64) {
        match &self.retry {
            Some(task) if task.id() == id => {
                self.retry = None;
                info!(attempt = self.attempts, "retrying messaging connection");
                self.start(false).await;
            }
            _ => debug!(id, "ignoring superseded retry timer"),
        }
    }

    async fn on_pairing_expired(&mut self, token_id: u64) {
        let live = self.token.as_ref().map(|t| t.id);
        if self.state != ConnectionState::PairingRequired || live != Some(token_id) {
            debug!(token_id, "ignoring superseded pairing expiry");
            return;
        }
        self.clear_pairing();
        self.log("QR code expired. Reinitializing with a new session...");
        self.transition(ConnectionState::PairingExpired, false).await;
        self.starting = false;
        self.start(true).await;
    }

    async fn on_stall_fired(&mut self, id: u64) {
        match &self.stall {
            Some(task) if task.id() == id => self.stall = None,
            _ => {
                debug!(id, "ignoring superseded stall timer");
                return;
            }
        }
        warn!(state = %self.state, "no progress from the messaging client, restarting");
        self.log(format!(
            "WhatsApp client made no progress in {} seconds ({}). Restarting...",
            self.settings.init_timeout.as_secs(),
            self.state
        ));
        self.clear_pairing();
        self.teardown().await;
        self.record_failure().await;
    }

    async fn on_init_result(
        &mut self,
        generation: u64,
        result: Result<Box<dyn TransportHandle>, TiffinError>,
    ) {
        match result {
            Ok(handle) => {
                let handle: Arc<dyn TransportHandle> = Arc::from(handle);
                if generation != self.generation {
                    debug!(generation, "shutting down handle from a superseded attempt");
                    tokio::spawn(async move {
                        let _ = handle.shutdown().await;
                    });
                    return;
                }
                *self.handle.write().await = Some(handle);
                self.log("WhatsApp client initialized.");
            }
            Err(e) => {
                if generation != self.generation {
                    debug!(generation, error = %e, "ignoring failure of a superseded attempt");
                    return;
                }
                self.log(format!("Client initialization failed: {e}"));
                self.clear_pairing();
                self.teardown().await;
                self.record_failure().await;
            }
        }
    }

    // --- transport events ---

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::PairingCode(payload) => self.on_pairing_code(payload).await,
            TransportEvent::Authenticated => self.on_authenticated().await,
            TransportEvent::Ready => self.on_ready().await,
            TransportEvent::AuthFailure(message) => self.on_auth_failure(message).await,
            TransportEvent::Disconnected(reason) => self.on_disconnected(reason).await,
            TransportEvent::Message(message) => self.on_message(message),
        }
    }

    async fn on_pairing_code(&mut self, payload: String) {
        if matches!(
            self.state,
            ConnectionState::Authenticated | ConnectionState::Ready
        ) {
            warn!(state = %self.state, "pairing code received on an authenticated connection, ignoring");
            return;
        }
        self.expiry = None;
        self.stall = None;
        let token = self.pairing.issue(payload);
        let token_id = token.id;
        let image = match pairing::render_data_url(&token.payload) {
            Ok(image) => Some(image),
            Err(e) => {
                self.log(format!("Failed to render QR code: {e}"));
                None
            }
        };
        self.token = Some(token);
        self.attempts = 0;
        self.last_authenticated_at = None;

        self.transition(ConnectionState::PairingRequired, false).await;
        self.log("QR code received. Please scan...");
        match image {
            Some(image) => {
                self.pairing_image = Some(image.clone());
                self.bus.pairing_payload(Some(image));
            }
            None => {
                if self.pairing_image.take().is_some() {
                    self.bus.pairing_payload(None);
                }
            }
        }
        self.arm_expiry(token_id);
    }

    async fn on_authenticated(&mut self) {
        if !matches!(
            self.state,
            ConnectionState::Initializing | ConnectionState::PairingRequired
        ) {
            debug!(state = %self.state, "ignoring authenticated event");
            return;
        }
        self.clear_pairing();
        self.attempts = 0;
        self.last_authenticated_at = Some(Utc::now());
        self.transition(ConnectionState::Authenticated, false).await;
        self.log("Authenticated successfully.");
        self.arm_stall();
        self.bus.session_info(self.last_authenticated_at);
    }

    async fn on_ready(&mut self) {
        if !matches!(
            self.state,
            ConnectionState::Initializing
                | ConnectionState::PairingRequired
                | ConnectionState::Authenticated
        ) {
            debug!(state = %self.state, "ignoring ready event");
            return;
        }
        self.clear_pairing();
        self.stall = None;
        self.attempts = 0;
        self.starting = false;
        self.transition(ConnectionState::Ready, false).await;
        self.log("WhatsApp client is ready and connected!");
        self.bus.session_info(self.last_authenticated_at);
    }

    async fn on_auth_failure(&mut self, message: String) {
        self.log(format!("Authentication failed: {message}. Reinitializing..."));
        self.clear_pairing();
        self.transition(ConnectionState::AuthFailure, false).await;
        self.teardown().await;
        self.starting = false;
        self.start(true).await;
    }

    async fn on_disconnected(&mut self, reason: DisconnectReason) {
        self.log(format!("Disconnected: {reason}."));
        self.clear_pairing();
        self.teardown().await;
        self.starting = false;
        if reason.is_critical() {
            self.transition(ConnectionState::Disconnected, false).await;
            self.log("Critical disconnection. Forcing new session...");
            self.start(true).await;
        } else {
            self.log(format!(
                "Disconnected for reason: {reason}. Attempting to reconnect..."
            ));
            self.record_failure().await;
        }
    }

    fn on_message(&self, message: InboundMessage) {
        self.bus
            .log(format!("Message from {}: {}", message.sender_id, message.body));
        match &self.inbound {
            Some(dispatcher) => {
                dispatcher.dispatch(message, Arc::new(self.sender.clone()));
            }
            None => debug!("no inbound dispatcher configured, dropping message"),
        }
    }

    // --- observation ---

    /// Persists and announces a state change.
    async fn transition(&mut self, next: ConnectionState, halted: bool) {
        let previous = self.state;
        self.state = next;
        self.halted = halted;

        let record = ConnectionRecord {
            status: next,
            last_authenticated_at: self.last_authenticated_at,
            halted,
            updated_at: Utc::now(),
        };
        if let Err(e) = self.store.save(&record).await {
            warn!(error = %e, "failed to persist connection status");
        }

        info!(from = %previous, to = %next, halted, "connection state changed");
        metrics::record_transition(next);
        self.bus.status(next, halted);
        if previous == ConnectionState::PairingRequired
            && next != ConnectionState::PairingRequired
            && self.pairing_image.take().is_some()
        {
            self.bus.pairing_payload(None);
        }
        self.publish_snapshot();
    }

    fn log(&self, message: impl Into<String>) {
        self.bus.log(message);
    }

    fn publish_snapshot(&self) {
        self.snapshot.send_replace(ControllerSnapshot {
            state: self.state,
            halted: self.halted,
            attempts: self.attempts,
            starting: self.starting,
            pairing_image: self.pairing_image.clone(),
            last_authenticated_at: self.last_authenticated_at,
        });
    }
}
