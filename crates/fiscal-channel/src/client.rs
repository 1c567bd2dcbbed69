//! Socket.IO channel client.

use crate::{ChannelError, ChannelResult, EnginePacket, Handshake, SocketPacket};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

/// How long to wait for the Engine.IO open packet after the WebSocket upgrade.
const OPEN_TIMEOUT: Duration = Duration::from_secs(20);

/// Channel client configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Server URL (e.g., ws://fp-socket.exagonplus.com).
    pub url: String,
    /// First reconnect delay.
    pub reconnect_base_delay: Duration,
    /// Reconnect delay cap.
    pub reconnect_max_delay: Duration,
    /// Consecutive failed attempts before giving up. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    /// Capacity of the event stream.
    pub event_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://fp-socket.exagonplus.com".to_string(),
            reconnect_base_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(5),
            max_reconnect_attempts: None,
            event_buffer: 256,
        }
    }
}

impl ChannelConfig {
    /// Delay before reconnect attempt number `attempt` (1-based).
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.reconnect_base_delay
            .saturating_mul(factor)
            .min(self.reconnect_max_delay)
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Events emitted by the channel client.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// The server emitted an application event. `payload` is its first argument.
    Event { name: String, payload: Value },
    /// The server acknowledged an event emitted with an ack id.
    Ack { id: u64, args: Vec<Value> },
}

/// Build the Engine.IO WebSocket endpoint for a server URL.
pub fn socket_io_url(base: &str) -> ChannelResult<Url> {
    let mut url = Url::parse(base)?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(ChannelError::InvalidUrl(format!(
                "unsupported scheme '{other}'"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ChannelError::InvalidUrl(format!("cannot use scheme '{scheme}'")))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));

    Ok(url)
}

enum Command {
    Send(SocketPacket),
    Close,
}

/// Cloneable handle for emitting events on the channel.
#[derive(Clone)]
pub struct ChannelEmitter {
    outbound: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    next_ack_id: Arc<AtomicU64>,
}

impl ChannelEmitter {
    /// Emit an event without requesting an acknowledgment.
    pub async fn emit(&self, name: &str, payload: Value) -> ChannelResult<()> {
        self.send(SocketPacket::event(name, payload, None)).await
    }

    /// Emit an event and request an acknowledgment. Returns the ack id to
    /// match against [`ChannelEvent::Ack`].
    pub async fn emit_with_ack(&self, name: &str, payload: Value) -> ChannelResult<u64> {
        let id = self.next_ack_id.fetch_add(1, Ordering::Relaxed);
        self.send(SocketPacket::event(name, payload, Some(id))).await?;
        Ok(id)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    async fn send(&self, packet: SocketPacket) -> ChannelResult<()> {
        if self.state() != ConnectionState::Connected {
            return Err(ChannelError::NotConnected);
        }
        self.outbound
            .send(Command::Send(packet))
            .await
            .map_err(|_| ChannelError::Closed)
    }
}

/// A live channel: event stream, emitter and read-only state.
pub struct ChannelHandle {
    emitter: ChannelEmitter,
    events: mpsc::Receiver<ChannelEvent>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// A cloneable emitter for this channel.
    pub fn emitter(&self) -> ChannelEmitter {
        self.emitter.clone()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Next event, or `None` once the connection task has given up.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Close the connection and stop reconnecting.
    pub async fn close(self) {
        let _ = self.emitter.outbound.send(Command::Close).await;
        let mut task = self.task;
        if timeout(Duration::from_secs(5), &mut task).await.is_err() {
            warn!("Channel task did not stop in time, aborting");
            task.abort();
        }
    }
}

/// Entry point for opening the event channel.
pub struct ChannelClient;

impl ChannelClient {
    /// Start the connection task. Returns immediately in the `Connecting` state.
    pub fn connect(config: ChannelConfig) -> ChannelResult<ChannelHandle> {
        let url = socket_io_url(&config.url)?;

        let (event_tx, events) = mpsc::channel(config.event_buffer.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(32);
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);

        let emitter = ChannelEmitter {
            outbound: outbound_tx,
            state: state.clone(),
            next_ack_id: Arc::new(AtomicU64::new(0)),
        };

        let connection = Connection {
            config,
            url,
            events: event_tx,
            outbound: outbound_rx,
            state: state_tx,
        };
        let task = tokio::spawn(connection.run());

        Ok(ChannelHandle {
            emitter,
            events,
            state,
            task,
        })
    }
}

/// How a single WebSocket session ended without an error.
enum SessionEnd {
    /// Closed on request; do not reconnect.
    ClientClosed,
    /// Server closed the socket or the namespace.
    ServerClosed,
}

/// Connection task state. Owns the only writer of the connection state.
struct Connection {
    config: ChannelConfig,
    url: Url,
    events: mpsc::Sender<ChannelEvent>,
    outbound: mpsc::Receiver<Command>,
    state: watch::Sender<ConnectionState>,
}

impl Connection {
    async fn run(mut self) {
        let mut attempts: u32 = 0;

        loop {
            info!(url = %self.url, "Connecting to event channel");

            let result = self.session().await;
            let was_connected = *self.state.borrow() == ConnectionState::Connected;

            match result {
                Ok(SessionEnd::ClientClosed) => {
                    self.set_state(ConnectionState::Disconnected).await;
                    info!("Event channel closed");
                    return;
                }
                Ok(SessionEnd::ServerClosed) => {
                    info!("Event channel closed by server");
                }
                Err(e) => {
                    warn!(error = %e, "Event channel connection lost");
                }
            }

            self.set_state(ConnectionState::Disconnected).await;
            self.discard_stale_commands();

            if was_connected {
                attempts = 0;
            }
            attempts += 1;

            if let Some(max) = self.config.max_reconnect_attempts {
                if attempts > max {
                    error!(attempts, "Max reconnect attempts reached, giving up");
                    return;
                }
            }

            let delay = self.config.reconnect_delay(attempts);
            info!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "Scheduling reconnect"
            );

            if self.wait_or_close(delay).await {
                info!("Event channel closed while waiting to reconnect");
                return;
            }
        }
    }

    /// One WebSocket session, from upgrade to close.
    async fn session(&mut self) -> ChannelResult<SessionEnd> {
        let upgrade = timeout(OPEN_TIMEOUT, connect_async(self.url.as_str()));
        tokio::pin!(upgrade);

        let ws_stream = loop {
            tokio::select! {
                result = &mut upgrade => {
                    let (ws_stream, _) =
                        result.map_err(|_| ChannelError::Timeout("websocket upgrade"))??;
                    break ws_stream;
                }
                command = self.outbound.recv() => match command {
                    Some(Command::Send(packet)) => {
                        debug!(packet = ?packet, "Discarding emission while connecting");
                    }
                    Some(Command::Close) | None => return Ok(SessionEnd::ClientClosed),
                },
            }
        };
        let (mut write, mut read) = ws_stream.split();

        // Engine.IO open packet
        let handshake = match timeout(OPEN_TIMEOUT, read.next()).await {
            Err(_) => return Err(ChannelError::Timeout("engine open packet")),
            Ok(None) => return Ok(SessionEnd::ServerClosed),
            Ok(Some(frame)) => match frame? {
                Message::Text(text) => match EnginePacket::decode(text.as_str())? {
                    EnginePacket::Open(handshake) => handshake,
                    other => {
                        return Err(ChannelError::Protocol(format!(
                            "expected open packet, got {other:?}"
                        )))
                    }
                },
                other => {
                    return Err(ChannelError::Protocol(format!(
                        "expected text frame, got {other:?}"
                    )))
                }
            },
        };
        debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Engine open");

        // Socket.IO namespace connect
        let connect = EnginePacket::Message(SocketPacket::Connect(None)).encode()?;
        write.send(Message::Text(connect.into())).await?;

        let deadline = heartbeat_deadline(&handshake);

        loop {
            tokio::select! {
                frame = timeout(deadline, read.next()) => {
                    let frame = match frame {
                        Err(_) => return Err(ChannelError::Timeout("server heartbeat")),
                        Ok(None) => return Ok(SessionEnd::ServerClosed),
                        Ok(Some(frame)) => frame?,
                    };

                    match frame {
                        Message::Text(text) => {
                            let packet = match EnginePacket::decode(text.as_str()) {
                                Ok(packet) => packet,
                                Err(e) => {
                                    warn!(error = %e, "Failed to parse channel frame");
                                    continue;
                                }
                            };

                            match packet {
                                EnginePacket::Ping => {
                                    let pong = EnginePacket::Pong.encode()?;
                                    write.send(Message::Text(pong.into())).await?;
                                }
                                EnginePacket::Close => return Ok(SessionEnd::ServerClosed),
                                EnginePacket::Message(packet) => {
                                    if let Some(end) = self.handle_packet(packet).await? {
                                        return Ok(end);
                                    }
                                }
                                other => debug!(packet = ?other, "Ignoring engine packet"),
                            }
                        }
                        Message::Ping(data) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Message::Close(_) => return Ok(SessionEnd::ServerClosed),
                        _ => {}
                    }
                }
                command = self.outbound.recv() => {
                    match command {
                        Some(Command::Send(packet)) => {
                            let frame = EnginePacket::Message(packet).encode()?;
                            write.send(Message::Text(frame.into())).await?;
                        }
                        Some(Command::Close) | None => {
                            let disconnect = EnginePacket::Message(SocketPacket::Disconnect).encode()?;
                            let _ = write.send(Message::Text(disconnect.into())).await;
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(SessionEnd::ClientClosed);
                        }
                    }
                }
            }
        }
    }

    /// Handle one Socket.IO packet. Returns `Some` when the session must end.
    async fn handle_packet(&self, packet: SocketPacket) -> ChannelResult<Option<SessionEnd>> {
        match packet {
            SocketPacket::Connect(data) => {
                debug!(data = ?data, "Namespace connected");
                self.set_state(ConnectionState::Connected).await;
            }
            SocketPacket::ConnectError(data) => {
                let message = data
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| data.to_string());
                return Err(ChannelError::Handshake(message));
            }
            SocketPacket::Disconnect => {
                info!("Server disconnected the namespace");
                return Ok(Some(SessionEnd::ServerClosed));
            }
            SocketPacket::Event { name, args, .. } => {
                debug!(event = %name, "Received channel event");
                let payload = args.into_iter().next().unwrap_or(Value::Null);
                self.publish(ChannelEvent::Event { name, payload }).await;
            }
            SocketPacket::Ack { id, args } => {
                debug!(ack_id = id, "Received acknowledgment");
                self.publish(ChannelEvent::Ack { id, args }).await;
            }
        }
        Ok(None)
    }

    async fn set_state(&self, next: ConnectionState) {
        let previous = *self.state.borrow();
        if previous == next {
            return;
        }
        self.state.send_replace(next);
        info!(from = ?previous, to = ?next, "Channel state changed");
        self.publish(ChannelEvent::StateChanged(next)).await;
    }

    async fn publish(&self, event: ChannelEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }

    /// Drop emissions queued for a connection that no longer exists.
    fn discard_stale_commands(&mut self) {
        while let Ok(command) = self.outbound.try_recv() {
            match command {
                Command::Send(packet) => debug!(packet = ?packet, "Discarding stale emission"),
                // The next recv() then yields None, which ends the reconnect wait.
                Command::Close => self.outbound.close(),
            }
        }
    }

    /// Sleep before reconnecting. Returns true if a close was requested meanwhile.
    async fn wait_or_close(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                command = self.outbound.recv() => match command {
                    Some(Command::Send(packet)) => {
                        debug!(packet = ?packet, "Discarding emission while disconnected");
                    }
                    Some(Command::Close) | None => return true,
                },
            }
        }
    }
}

fn heartbeat_deadline(handshake: &Handshake) -> Duration {
    let deadline = handshake.heartbeat_deadline();
    if deadline.is_zero() {
        OPEN_TIMEOUT
    } else {
        deadline
    }
}
