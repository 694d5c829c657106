//! Realtime event hub: one logical WebSocket channel, named-event listeners.
//!
//! The hub owns a background task per connection session. The task opens the
//! channel, pumps inbound frames to listeners, forwards outbound messages and
//! reconnects with exponential backoff. Public methods talk to it through an
//! unbounded command channel, so none of them block or await.
//!
//! Every session carries a number. `disconnect()` bumps the number under the
//! state lock, and the task checks it before every state change and before
//! every listener call, so a torn-down session can never notify anyone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::tungstenite::protocol::Message;

use super::event::{ConnectionState, EventKind, HubEvent, InboundMessage};
use super::registry::{ListenerId, ListenerRegistry, Subscription};
use super::websocket::{connect_ws, validate_ws_url, WebSocketStream, FAR_FUTURE, MAX_FRAME_BYTES};
use crate::config::LinkConfig;
use crate::error::{BidLinkError, Result};
use crate::event_handlers::{ConnectionError, DisconnectReason};
use crate::models::ConnectionOptions;
use crate::storage::TokenStorage;
use crate::timeouts::LinkTimeouts;

// ── Commands ────────────────────────────────────────────────────────────────

enum HubCmd {
    Send(String),
    /// Skip any pending backoff and try to connect right away.
    ReconnectNow,
    Shutdown,
}

struct HubShared {
    state: watch::Sender<ConnectionState>,
    registry: Arc<ListenerRegistry>,
    session: AtomicU64,
}

impl HubShared {
    fn is_current(&self, session: u64) -> bool {
        self.session.load(Ordering::SeqCst) == session
    }

    /// Start a new session and move to `state`. Returns the new session and
    /// the state it replaced.
    fn begin_session(&self, state: ConnectionState) -> (u64, ConnectionState) {
        let mut session = 0;
        let mut previous = state;
        self.state.send_modify(|current| {
            session = self.session.fetch_add(1, Ordering::SeqCst) + 1;
            previous = *current;
            *current = state;
        });
        (session, previous)
    }

    /// Change state on behalf of `session`; ignored once the session is stale.
    fn set_state(&self, session: u64, state: ConnectionState) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|current| {
            if !self.is_current(session) {
                return false;
            }
            applied = true;
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        applied
    }

    fn emit(&self, session: u64, event: HubEvent) {
        self.registry.dispatch(&event, &|| self.is_current(session));
    }
}

struct Worker {
    cmd_tx: mpsc::UnboundedSender<HubCmd>,
    task: JoinHandle<()>,
}

// ── EventHub (public handle) ────────────────────────────────────────────────

/// Single logical connection to the server-push channel.
///
/// Construct once at startup and share by reference (or `Arc`) with whatever
/// needs live updates.
///
/// # Examples
///
/// ```rust,no_run
/// use bid_review_link::{EventHub, EventKind, HubEvent};
///
/// # async fn run() -> bid_review_link::Result<()> {
/// let hub = EventHub::builder()
///     .ws_url("ws://localhost:8000/ws/updates/")
///     .build()?;
///
/// let _sub = hub.subscribe(EventKind::BidCreated, |event: &HubEvent| {
///     if let Some(domain) = event.as_domain() {
///         println!("{}", domain.name());
///     }
/// });
///
/// hub.connect()?;
/// # Ok(())
/// # }
/// ```
pub struct EventHub {
    ws_url: String,
    options: ConnectionOptions,
    timeouts: LinkTimeouts,
    tokens: Option<TokenStorage>,
    shared: Arc<HubShared>,
    worker: Mutex<Option<Worker>>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("ws_url", &self.ws_url)
            .field("state", &self.state())
            .field("options", &self.options)
            .finish()
    }
}

impl EventHub {
    pub fn builder() -> EventHubBuilder {
        EventHubBuilder::new()
    }

    /// Hub with default options and no credentials.
    pub fn new(ws_url: impl Into<String>) -> Result<Self> {
        Self::builder().ws_url(ws_url).build()
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Open the channel.
    ///
    /// Returns immediately; `connected` or `error` listeners report the
    /// outcome. Calling this while connecting or connected does nothing. While
    /// the hub is waiting to reconnect it skips the remaining backoff.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = worker.as_ref() {
            if !existing.task.is_finished() {
                if self.state().is_active() {
                    log::debug!("[HUB] connect() ignored: already {}", self.state());
                    return Ok(());
                }
                let session = self.shared.session.load(Ordering::SeqCst);
                self.shared.set_state(session, ConnectionState::Connecting);
                if existing.cmd_tx.send(HubCmd::ReconnectNow).is_ok() {
                    return Ok(());
                }
            }
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            BidLinkError::ConfigurationError(
                "EventHub::connect must be called from within a Tokio runtime".to_string(),
            )
        })?;

        if let Some(stale) = worker.take() {
            stale.task.abort();
        }

        let (session, _) = self.shared.begin_session(ConnectionState::Connecting);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let ctx = SessionContext {
            session,
            shared: self.shared.clone(),
            ws_url: self.ws_url.clone(),
            tokens: self.tokens.clone(),
            options: self.options.clone(),
            timeouts: self.timeouts.clone(),
        };
        log::info!("[HUB] Connecting to {} (session {})", self.ws_url, session);
        let task = runtime.spawn(run_session(ctx, cmd_rx));
        *worker = Some(Worker { cmd_tx, task });
        Ok(())
    }

    /// Tear the channel down and cancel any pending reconnect.
    ///
    /// `disconnected` listeners are notified once if there was anything to
    /// tear down. Nothing from the torn-down channel reaches listeners after
    /// this returns.
    pub fn disconnect(&self) {
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        let (session, previous) = self.shared.begin_session(ConnectionState::Disconnected);

        let Some(worker) = worker else {
            return;
        };
        if worker.cmd_tx.send(HubCmd::Shutdown).is_err() {
            worker.task.abort();
        }
        log::info!("[HUB] Disconnected by client (was {})", previous);
        self.shared.emit(
            session,
            HubEvent::Disconnected(DisconnectReason::client_requested()),
        );
    }

    /// Serialize `data` as JSON and queue it on the open channel.
    ///
    /// Fails with [`BidLinkError::NotConnected`] unless the hub is connected.
    /// Delivery is fire-and-forget from here on.
    pub fn send<T: Serialize + ?Sized>(&self, data: &T) -> Result<()> {
        let text = serde_json::to_string(data)?;
        self.send_text(text)
    }

    /// Queue a pre-encoded text frame. Same rules as [`send`](Self::send).
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(BidLinkError::NotConnected(format!(
                "Cannot send while {}",
                state
            )));
        }
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        match worker.as_ref() {
            Some(worker) => worker.cmd_tx.send(HubCmd::Send(text.into())).map_err(|_| {
                BidLinkError::NotConnected("Connection task is not running".to_string())
            }),
            None => Err(BidLinkError::NotConnected("No active connection".to_string())),
        }
    }

    /// Register `listener` for events of `kind`.
    ///
    /// Listeners run in registration order on the connection task and must
    /// not block. The returned guard unsubscribes when dropped.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&HubEvent) + Send + Sync + 'static,
    {
        let id = self.shared.registry.add(kind, Arc::new(listener));
        Subscription::new(kind, id, &self.shared.registry)
    }

    /// Remove a listener registered with [`subscribe`](Self::subscribe).
    /// Unknown ids are ignored; returns whether anything was removed.
    pub fn unsubscribe(&self, kind: EventKind, id: ListenerId) -> bool {
        self.shared.registry.remove(kind, id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.shared.registry.listener_count(kind)
    }
}

impl Drop for EventHub {
    fn drop(&mut self) {
        let worker = self.worker.get_mut().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            self.shared.session.fetch_add(1, Ordering::SeqCst);
            worker.task.abort();
        }
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Builder for [`EventHub`].
#[derive(Default)]
pub struct EventHubBuilder {
    ws_url: Option<String>,
    options: ConnectionOptions,
    timeouts: LinkTimeouts,
    tokens: Option<TokenStorage>,
}

impl EventHubBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Take the realtime endpoint from a [`LinkConfig`].
    pub fn config(mut self, config: &LinkConfig) -> Self {
        self.ws_url = Some(config.ws_url.clone());
        self
    }

    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timeouts(mut self, timeouts: LinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Authenticate the handshake with the access token in `tokens`.
    pub fn token_storage(mut self, tokens: TokenStorage) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn build(self) -> Result<EventHub> {
        let ws_url = self
            .ws_url
            .ok_or_else(|| BidLinkError::ConfigurationError("ws_url is required".into()))?;
        validate_ws_url(&ws_url)?;

        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Ok(EventHub {
            ws_url,
            options: self.options,
            timeouts: self.timeouts,
            tokens: self.tokens,
            shared: Arc::new(HubShared {
                state,
                registry: Arc::new(ListenerRegistry::new()),
                session: AtomicU64::new(0),
            }),
            worker: Mutex::new(None),
        })
    }
}

// ── Background session task ─────────────────────────────────────────────────

struct SessionContext {
    session: u64,
    shared: Arc<HubShared>,
    ws_url: String,
    tokens: Option<TokenStorage>,
    options: ConnectionOptions,
    timeouts: LinkTimeouts,
}

impl SessionContext {
    fn is_current(&self) -> bool {
        self.shared.is_current(self.session)
    }

    fn set_state(&self, state: ConnectionState) -> bool {
        self.shared.set_state(self.session, state)
    }

    fn emit(&self, event: HubEvent) {
        self.shared.emit(self.session, event);
    }

    /// Parse one inbound text frame and fan it out: first to `message`
    /// listeners, then to listeners of the domain event it carries.
    fn dispatch_text(&self, text: &str) {
        let value: JsonValue = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("[HUB] Ignoring frame that is not JSON: {}", e);
                return;
            },
        };
        let message = InboundMessage::from_value(value);
        let domain = message.decode_domain();
        let name = message.event.clone();

        self.emit(HubEvent::Message(message));
        match (domain, name) {
            (Some(Ok(event)), _) => self.emit(HubEvent::Domain(event)),
            (Some(Err(e)), Some(name)) => {
                log::warn!("[HUB] Malformed '{}' payload: {}", name, e)
            },
            (_, name) => log::trace!("[HUB] No domain mapping for {:?}", name),
        }
    }
}

/// Why the pump loop returned.
enum PumpExit {
    Shutdown,
    Lost {
        reason: DisconnectReason,
        error: Option<ConnectionError>,
    },
}

/// What to do after a failed attempt or a lost channel.
enum Backoff {
    Retry,
    /// `connect()` was called again: start counting attempts afresh.
    Requested,
    Shutdown,
}

async fn run_session(ctx: SessionContext, mut cmd_rx: mpsc::UnboundedReceiver<HubCmd>) {
    let mut failed_attempts: u32 = 0;
    // Authentication failures are not worth retrying until asked to.
    let mut retry_allowed = true;

    loop {
        if !ctx.set_state(ConnectionState::Connecting) {
            return;
        }

        match connect_ws(&ctx.ws_url, ctx.tokens.as_ref(), &ctx.options, &ctx.timeouts).await {
            Ok(mut ws) => {
                if !ctx.set_state(ConnectionState::Connected) {
                    let _ = ws.close(None).await;
                    return;
                }
                log::info!("[HUB] Connected to {}", ctx.ws_url);
                failed_attempts = 0;
                retry_allowed = true;
                ctx.emit(HubEvent::Connected);

                match pump(&ctx, &mut ws, &mut cmd_rx).await {
                    PumpExit::Shutdown => {
                        let _ = ws.close(None).await;
                        log::debug!("[HUB] Session {} closed", ctx.session);
                        return;
                    },
                    PumpExit::Lost { reason, error } => {
                        log::warn!("[HUB] Connection lost: {}", reason);
                        let next = if error.is_some() {
                            ConnectionState::Error
                        } else {
                            ConnectionState::Disconnected
                        };
                        if !ctx.set_state(next) {
                            return;
                        }
                        if let Some(error) = error {
                            ctx.emit(HubEvent::Error(error));
                        }
                        ctx.emit(HubEvent::Disconnected(reason));
                    },
                }
            },
            Err(e) => {
                let recoverable = !matches!(e, BidLinkError::AuthenticationError(_));
                log::warn!("[HUB] Connection attempt failed: {}", e);
                if !ctx.set_state(ConnectionState::Error) {
                    return;
                }
                ctx.emit(HubEvent::Error(ConnectionError::new(e.to_string(), recoverable)));
                retry_allowed = recoverable;
            },
        }

        let attempt = failed_attempts;
        let may_retry = retry_allowed && ctx.options.may_reconnect(attempt);
        if may_retry {
            failed_attempts = failed_attempts.saturating_add(1);
        } else if ctx.options.auto_reconnect && retry_allowed {
            log::warn!("[HUB] Max reconnection attempts ({}) reached", attempt);
            ctx.emit(HubEvent::Error(ConnectionError::new(
                format!("Max reconnection attempts ({}) reached", attempt),
                false,
            )));
        }

        let delay = may_retry.then(|| ctx.options.reconnect_delay(attempt));
        if let Some(delay) = delay {
            log::info!(
                "[HUB] Attempting reconnection in {}ms (attempt {})",
                delay.as_millis(),
                attempt + 1
            );
        }

        match wait_for_retry(&mut cmd_rx, delay).await {
            Backoff::Retry => {},
            Backoff::Requested => {
                failed_attempts = 0;
                retry_allowed = true;
            },
            Backoff::Shutdown => return,
        }
        if !ctx.is_current() {
            return;
        }
    }
}

/// Sleep out the backoff (or forever when `delay` is `None`) while staying
/// responsive to commands.
async fn wait_for_retry(
    cmd_rx: &mut mpsc::UnboundedReceiver<HubCmd>,
    delay: Option<std::time::Duration>,
) -> Backoff {
    let sleep_fut = tokio::time::sleep(delay.unwrap_or(FAR_FUTURE));
    tokio::pin!(sleep_fut);

    loop {
        tokio::select! {
            biased;
            cmd = cmd_rx.recv() => match cmd {
                Some(HubCmd::ReconnectNow) => return Backoff::Requested,
                Some(HubCmd::Send(_)) => {
                    log::debug!("[HUB] Dropping outbound message: not connected");
                },
                Some(HubCmd::Shutdown) | None => return Backoff::Shutdown,
            },
            _ = &mut sleep_fut, if delay.is_some() => return Backoff::Retry,
        }
    }
}

async fn pump(
    ctx: &SessionContext,
    ws: &mut WebSocketStream,
    cmd_rx: &mut mpsc::UnboundedReceiver<HubCmd>,
) -> PumpExit {
    let keepalive = ctx.timeouts.keepalive_interval;
    let has_keepalive = !keepalive.is_zero();
    let keepalive_dur = if has_keepalive { keepalive } else { FAR_FUTURE };
    let mut idle_deadline = TokioInstant::now() + keepalive_dur;

    let pong_timeout = ctx.timeouts.pong_timeout;
    let has_pong_timeout = has_keepalive && !pong_timeout.is_zero();
    let mut awaiting_pong = false;
    let mut pong_deadline = TokioInstant::now() + FAR_FUTURE;

    loop {
        let idle_sleep = tokio::time::sleep_until(idle_deadline);
        tokio::pin!(idle_sleep);
        let pong_sleep = tokio::time::sleep_until(pong_deadline);
        tokio::pin!(pong_sleep);

        tokio::select! {
            biased;

            _ = &mut pong_sleep, if has_pong_timeout && awaiting_pong => {
                return PumpExit::Lost {
                    reason: DisconnectReason::new(format!(
                        "Pong timeout ({:?}), server unresponsive",
                        pong_timeout
                    )),
                    error: None,
                };
            }

            cmd = cmd_rx.recv() => match cmd {
                Some(HubCmd::Send(text)) => {
                    if let Err(e) = ws.send(Message::Text(text.into())).await {
                        let message = format!("Send failed: {}", e);
                        return PumpExit::Lost {
                            reason: DisconnectReason::new(message.clone()),
                            error: Some(ConnectionError::new(message, true)),
                        };
                    }
                },
                Some(HubCmd::ReconnectNow) => {},
                Some(HubCmd::Shutdown) | None => return PumpExit::Shutdown,
            },

            _ = &mut idle_sleep, if has_keepalive && !awaiting_pong => {
                if let Err(e) = ws.send(Message::Ping(Bytes::new())).await {
                    return PumpExit::Lost {
                        reason: DisconnectReason::new(format!("Keepalive ping failed: {}", e)),
                        error: None,
                    };
                }
                if has_pong_timeout {
                    awaiting_pong = true;
                    pong_deadline = TokioInstant::now() + pong_timeout;
                }
                idle_deadline = TokioInstant::now() + keepalive_dur;
            }

            frame = ws.next() => {
                idle_deadline = TokioInstant::now() + keepalive_dur;
                if awaiting_pong {
                    awaiting_pong = false;
                    pong_deadline = TokioInstant::now() + FAR_FUTURE;
                }

                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_FRAME_BYTES {
                            log::warn!("[HUB] Text frame too large ({} bytes)", text.len());
                            continue;
                        }
                        ctx.dispatch_text(text.as_str());
                    },
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) if text.len() <= MAX_FRAME_BYTES => ctx.dispatch_text(text),
                        Ok(_) => log::warn!("[HUB] Binary frame too large ({} bytes)", data.len()),
                        Err(_) => log::warn!("[HUB] Ignoring non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = match frame {
                            Some(f) => DisconnectReason::with_code(f.reason.as_str(), f.code.into()),
                            None => DisconnectReason::new("Server closed connection"),
                        };
                        return PumpExit::Lost { reason, error: None };
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws.send(Message::Pong(payload)).await;
                    },
                    Some(Ok(Message::Pong(_))) => {
                        log::trace!("[HUB] Keepalive: received Pong");
                    },
                    Some(Ok(Message::Frame(_))) => {},
                    Some(Err(e)) => {
                        let message = e.to_string();
                        return PumpExit::Lost {
                            reason: DisconnectReason::new(format!("WebSocket error: {}", message)),
                            error: Some(ConnectionError::new(message, true)),
                        };
                    },
                    None => {
                        return PumpExit::Lost {
                            reason: DisconnectReason::new("WebSocket stream ended"),
                            error: None,
                        };
                    },
                }
            }
        }

        if !ctx.is_current() {
            return PumpExit::Shutdown;
        }
    }
}
