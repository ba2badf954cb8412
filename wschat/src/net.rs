//! Session supervisor bridging the TUI to the WebSocket.
//!
//! The main thread sends [`NetCommand`]s and drains [`NetEvent`]s on each
//! tick of the poll-based event loop. A single background task owns the
//! WebSocket: it alone connects, sends, closes and reconnects.
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ───  supervisor task ←→ server
//!                     ─── NetCommand →        ↑
//!                                     reconnect timers (AttemptId)
//! ```
//!
//! Reconnect timers are detached sleeps that report back the [`AttemptId`]
//! they were scheduled for. The supervisor hands that id to
//! [`Session::fire_reconnect`], which ignores it if a newer attempt exists.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use wschat_proto::codec::{decode_inbound, encode_outbound};
use wschat_proto::event::{InboundEvent, OutboundEvent};

use crate::backoff::Backoff;
use crate::config::ReconnectConfig;
use crate::session::{AttemptId, ConnectionState, Session};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, Message>;

/// Notice shown when a chat line is submitted without an open connection.
pub const NOT_CONNECTED_NOTICE: &str = "Not connected - message not sent";

/// Commands sent from the TUI main loop to the session supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetCommand {
    /// Send a chat line.
    SendChat {
        /// Message body.
        text: String,
    },
    /// Announce the start or end of a typing burst.
    SetTyping {
        /// New typing state.
        is_typing: bool,
    },
    /// Drop the current connection (or pending retry) and connect now.
    Reconnect,
    /// Close the connection, clear the token and stop.
    Logout,
    /// Stop without logging out.
    Shutdown,
}

/// Events sent from the session supervisor to the TUI main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// The connection was lost and a retry is scheduled.
    ReconnectScheduled {
        /// Consecutive failures so far.
        failures: u32,
        /// Time until the retry.
        delay: Duration,
    },
    /// A decoded server event.
    Inbound(InboundEvent),
    /// Something the user should hear about; the session carries on.
    Error(String),
    /// A chat message was not transmitted because no connection was open.
    ChatNotSent {
        /// The message as submitted.
        text: String,
    },
    /// The session ended by logout; the supervisor has stopped.
    LoggedOut,
}

/// Configuration for the session supervisor.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Base URL of the server; `ws` is resolved against it.
    pub server_url: Url,
    /// Timeout for a single connect attempt.
    pub connect_timeout: Duration,
    /// Channel capacity for command/event mpsc channels.
    pub channel_capacity: usize,
    /// Reconnect backoff bounds.
    pub reconnect: ReconnectConfig,
}

/// Errors from a single connect attempt. All of them lead to a retry.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The attempt did not complete within the connect timeout.
    #[error("connect timed out")]
    Timeout,

    /// The server refused the upgrade with 401 (token rejected or expired).
    #[error("server rejected the session token (HTTP 401)")]
    Unauthorized,

    /// The server refused the upgrade with another HTTP status.
    #[error("server refused the connection (HTTP {0})")]
    Http(u16),

    /// Network, TLS or protocol failure.
    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tungstenite::Error>),

    /// The WebSocket URL could not be derived from the server URL.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
}

/// Builds the WebSocket URL for `base`: `ws` is joined onto the base path,
/// `http`/`https` map to `ws`/`wss`, and the token becomes the only query
/// parameter.
///
/// # Errors
///
/// Returns [`NetError::InvalidUrl`] for a base with an unsupported scheme.
pub fn session_url(base: &Url, token: &str) -> Result<Url, NetError> {
    let mut url = base
        .join("ws")
        .map_err(|e| NetError::InvalidUrl(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(NetError::InvalidUrl(format!(
                "unsupported scheme `{other}`"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| NetError::InvalidUrl(format!("cannot switch to `{scheme}`")))?;
    url.set_fragment(None);
    url.query_pairs_mut().clear().append_pair("token", token);
    Ok(url)
}

/// Spawns the session supervisor and returns its channel handles.
///
/// The first connect attempt starts immediately. The supervisor runs until
/// [`NetCommand::Logout`], [`NetCommand::Shutdown`], or the command sender
/// is dropped. A `channel_capacity` of zero is treated as one.
#[must_use]
pub fn spawn_session(
    config: NetConfig,
    session: Session,
) -> (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>) {
    let capacity = config.channel_capacity.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let (evt_tx, evt_rx) = mpsc::channel(capacity);
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();

    let supervisor = Supervisor {
        backoff: Backoff::new(config.reconnect),
        config,
        session,
        cmd_rx,
        evt_tx,
        timer_tx,
        timer_rx,
    };
    tokio::spawn(supervisor.run());

    (cmd_tx, evt_rx)
}

/// What the supervisor does next.
enum Step {
    Connect(AttemptId),
    AwaitRetry,
    Stop,
}

struct Supervisor {
    config: NetConfig,
    session: Session,
    backoff: Backoff,
    cmd_rx: mpsc::Receiver<NetCommand>,
    evt_tx: mpsc::Sender<NetEvent>,
    timer_tx: mpsc::UnboundedSender<AttemptId>,
    timer_rx: mpsc::UnboundedReceiver<AttemptId>,
}

impl Supervisor {
    async fn run(mut self) {
        tracing::info!(user = %self.session.username(), "session supervisor started");
        let mut step = self.start_attempt().await;
        loop {
            step = match step {
                Step::Connect(attempt) => self.connect_and_serve(attempt).await,
                Step::AwaitRetry => self.await_retry().await,
                Step::Stop => break,
            };
        }
        tracing::info!("session supervisor exiting");
    }

    async fn emit(&self, event: NetEvent) {
        if self.evt_tx.send(event).await.is_err() {
            tracing::debug!("event receiver dropped");
        }
    }

    async fn start_attempt(&mut self) -> Step {
        match self.session.begin_attempt() {
            Some(attempt) => {
                self.emit(NetEvent::StateChanged(ConnectionState::Connecting))
                    .await;
                Step::Connect(attempt)
            }
            None => Step::Stop,
        }
    }

    async fn connect_and_serve(&mut self, attempt: AttemptId) -> Step {
        let url = match session_url(&self.config.server_url, self.session.token()) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(err = %e, "cannot build session url");
                self.emit(NetEvent::Error(e.to_string())).await;
                return self.connection_lost(attempt).await;
            }
        };
        let host = url.host_str().unwrap_or_default().to_string();
        tracing::info!(%attempt, host = %host, "connecting");

        let connect = connect_ws(&url, self.config.connect_timeout);
        tokio::pin!(connect);
        let result = loop {
            tokio::select! {
                result = &mut connect => break result,
                cmd = self.cmd_rx.recv() => {
                    if let Some(step) = self.offline_command(cmd).await {
                        return step;
                    }
                }
            }
        };

        let ws = match result {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(%attempt, host = %host, err = %e, "connect failed");
                if matches!(e, NetError::Unauthorized) {
                    self.emit(NetEvent::Error(e.to_string())).await;
                }
                return self.connection_lost(attempt).await;
            }
        };

        if !self.session.mark_open(attempt) {
            tracing::debug!(%attempt, "dropping connection for superseded attempt");
            return Step::AwaitRetry;
        }
        self.backoff.reset();
        tracing::info!(%attempt, host = %host, "connected");
        self.emit(NetEvent::StateChanged(ConnectionState::Open))
            .await;

        self.serve(ws, attempt).await
    }

    /// Pumps frames and commands for an open connection.
    async fn serve(&mut self, ws: WsStream, attempt: AttemptId) -> Step {
        let (mut sink, mut stream) = ws.split();
        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()).await,
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(err = %e, "websocket read error");
                        break;
                    }
                    None => break,
                },
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(NetCommand::SendChat { text }) => {
                        if !self.send(&mut sink, &OutboundEvent::Chat { text }).await {
                            break;
                        }
                    }
                    Some(NetCommand::SetTyping { is_typing }) => {
                        if !self.send(&mut sink, &OutboundEvent::Typing { is_typing }).await {
                            break;
                        }
                    }
                    Some(NetCommand::Reconnect) => {
                        tracing::info!("manual reconnect");
                        let _ = sink.close().await;
                        return self.start_attempt().await;
                    }
                    Some(NetCommand::Logout) => {
                        let _ = sink.close().await;
                        self.logout().await;
                        return Step::Stop;
                    }
                    Some(NetCommand::Shutdown) | None => {
                        let _ = sink.close().await;
                        return Step::Stop;
                    }
                },
            }
        }
        self.connection_lost(attempt).await
    }

    /// Encodes and writes one outbound event. Returns `false` if the
    /// connection is gone.
    async fn send(&self, sink: &mut WsSink, event: &OutboundEvent) -> bool {
        let json = match encode_outbound(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(err = %e, "failed to encode outbound event");
                self.emit(NetEvent::Error(format!("Send failed: {e}"))).await;
                return true;
            }
        };
        match sink.send(Message::text(json)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(err = %e, "websocket send failed");
                if let OutboundEvent::Chat { text } = event {
                    self.emit(NetEvent::ChatNotSent { text: text.clone() })
                        .await;
                }
                false
            }
        }
    }

    async fn dispatch(&self, text: &str) {
        match decode_inbound(text) {
            Ok(Some(event)) => {
                tracing::trace!(kind = event.kind(), "inbound event");
                self.emit(NetEvent::Inbound(event)).await;
            }
            Ok(None) => tracing::debug!("ignoring event with unknown type"),
            Err(e) => tracing::warn!(err = %e, "malformed frame, dropping"),
        }
    }

    /// Handles a command while no connection is open. Returns the next step
    /// if the command ends the current phase.
    async fn offline_command(&mut self, cmd: Option<NetCommand>) -> Option<Step> {
        match cmd {
            Some(NetCommand::SendChat { text }) => {
                tracing::debug!("chat dropped, no open connection");
                self.emit(NetEvent::ChatNotSent { text }).await;
                None
            }
            Some(NetCommand::SetTyping { .. }) => None,
            Some(NetCommand::Reconnect) => {
                tracing::info!("manual reconnect");
                Some(self.start_attempt().await)
            }
            Some(NetCommand::Logout) => {
                self.logout().await;
                Some(Step::Stop)
            }
            Some(NetCommand::Shutdown) | None => Some(Step::Stop),
        }
    }

    async fn connection_lost(&mut self, attempt: AttemptId) -> Step {
        if !self.session.mark_lost(attempt) {
            return Step::AwaitRetry;
        }
        self.emit(NetEvent::StateChanged(ConnectionState::Reconnecting))
            .await;

        let delay = self.backoff.next_delay();
        let failures = self.backoff.failures();
        tracing::info!(%attempt, failures, delay_ms = delay.as_millis(), "reconnect scheduled");

        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = timer_tx.send(attempt);
        });

        self.emit(NetEvent::ReconnectScheduled { failures, delay })
            .await;
        Step::AwaitRetry
    }

    async fn await_retry(&mut self) -> Step {
        loop {
            tokio::select! {
                Some(scheduled_for) = self.timer_rx.recv() => {
                    if let Some(attempt) = self.session.fire_reconnect(scheduled_for) {
                        self.emit(NetEvent::StateChanged(ConnectionState::Connecting))
                            .await;
                        return Step::Connect(attempt);
                    }
                    tracing::debug!(%scheduled_for, "ignoring stale reconnect timer");
                }
                cmd = self.cmd_rx.recv() => {
                    if let Some(step) = self.offline_command(cmd).await {
                        return step;
                    }
                }
            }
        }
    }

    async fn logout(&mut self) {
        tracing::info!(user = %self.session.username(), "logging out");
        self.session.logout();
        self.emit(NetEvent::StateChanged(ConnectionState::Disconnected))
            .await;
        self.emit(NetEvent::LoggedOut).await;
    }
}

async fn connect_ws(url: &Url, timeout: Duration) -> Result<WsStream, NetError> {
    let (ws, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| NetError::Timeout)?
        .map_err(map_connect_error)?;
    Ok(ws)
}

/// Map a `tokio_tungstenite` connection error to a [`NetError`].
fn map_connect_error(err: tungstenite::Error) -> NetError {
    match err {
        tungstenite::Error::Http(response) => {
            let status = response.status();
            if status.as_u16() == 401 {
                NetError::Unauthorized
            } else {
                NetError::Http(status.as_u16())
            }
        }
        other => NetError::WebSocket(Box::new(other)),
    }
}
