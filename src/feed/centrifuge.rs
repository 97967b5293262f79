//! Centrifugo feed for order book deltas
//!
//! Connects over WebSocket, authenticates, subscribes to one channel and
//! turns protocol traffic into `FeedEvent`s. Every new WebSocket connection
//! starts a fresh session (connect, then subscribe); connections after the
//! first are reported as `Reconnected` so the book is rebuilt from scratch.

use super::protocol::{
    parse_frames, Command, ConnectRequest, Method, ServerFrame, SubscribeRequest, PONG_FRAME,
};
use super::{BookFeed, ConnectionEvent, FeedEvent, Publication, SubscriptionEvent};
use crate::config::FeedConfig;
use crate::ws::{WsClient, WsConfig, WsMessage};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Client name sent in the connect command
pub const CLIENT_NAME: &str = "orderbook-sync";

/// Server unsubscribe codes after which the client subscribes again
pub const RESUBSCRIBE_CODES: std::ops::Range<u32> = 2500..3000;

/// Configuration for the Centrifugo feed
#[derive(Debug, Clone)]
pub struct CentrifugeConfig {
    /// WebSocket endpoint, e.g. `ws://host:8000/connection/websocket`
    pub url: String,
    /// Connection token
    pub token: Option<String>,
    /// Channel carrying the market's deltas
    pub channel: String,
    /// Maximum consecutive failed connection attempts (0 = infinite)
    pub max_reconnects: u32,
    /// Delay between connection attempts
    pub reconnect_delay: Duration,
    /// WebSocket ping interval
    pub ping_interval: Duration,
    /// Channel buffer size for feed events
    pub buffer_size: usize,
}

impl From<&FeedConfig> for CentrifugeConfig {
    fn from(config: &FeedConfig) -> Self {
        Self {
            url: config.url.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            channel: config.channel.clone(),
            max_reconnects: config.max_reconnects,
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            ping_interval: Duration::from_secs(config.ping_interval_secs),
            buffer_size: 1024,
        }
    }
}

/// Where the session is in the connect/subscribe handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// No transport connection
    Offline,
    /// Connect command sent
    Connecting { id: u32 },
    /// Subscribe command sent
    Subscribing { id: u32 },
    /// Receiving publications
    Subscribed,
}

/// What the session wants done after one transport message
#[derive(Debug, Default, PartialEq)]
pub struct SessionOutput {
    /// Frames to write to the socket
    pub outgoing: Vec<String>,
    /// Events for the book service
    pub events: Vec<FeedEvent>,
    /// The transport is gone for good
    pub finished: bool,
}

/// Protocol state machine, independent of the socket
#[derive(Debug)]
pub struct CentrifugeSession {
    token: Option<String>,
    channel: String,
    state: SessionState,
    next_id: u32,
    ever_connected: bool,
    pong: bool,
}

impl CentrifugeSession {
    /// Create a session for one channel
    pub fn new(token: Option<String>, channel: impl Into<String>) -> Self {
        Self {
            token,
            channel: channel.into(),
            state: SessionState::Offline,
            next_id: 0,
            ever_connected: false,
            pong: false,
        }
    }

    /// Whether publications are currently flowing
    pub fn is_subscribed(&self) -> bool {
        self.state == SessionState::Subscribed
    }

    /// Advance on one transport message
    pub fn on_ws_message(&mut self, msg: WsMessage) -> SessionOutput {
        let mut out = SessionOutput::default();

        match msg {
            WsMessage::Connected => {
                let event = if self.ever_connected {
                    ConnectionEvent::Reconnected
                } else {
                    ConnectionEvent::Connected
                };
                self.ever_connected = true;
                self.pong = false;
                out.events.push(FeedEvent::Connection(event));

                let id = self.next_command_id();
                out.outgoing.push(
                    Command {
                        id,
                        method: Method::Connect(ConnectRequest {
                            token: self.token.clone(),
                            name: CLIENT_NAME.to_string(),
                        }),
                    }
                    .to_frame(),
                );
                self.state = SessionState::Connecting { id };
            }
            WsMessage::Reconnecting { attempt } => {
                self.state = SessionState::Offline;
                out.events
                    .push(FeedEvent::Connection(ConnectionEvent::Reconnecting { attempt }));
            }
            WsMessage::Disconnected => {
                self.state = SessionState::Offline;
                out.events
                    .push(FeedEvent::Connection(ConnectionEvent::Disconnected));
                out.finished = true;
            }
            WsMessage::Text(text) => {
                for frame in parse_frames(&text) {
                    match frame {
                        Ok(frame) => self.on_frame(frame, &mut out),
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                preview = %text.chars().take(200).collect::<String>(),
                                "Failed to parse server frame"
                            );
                        }
                    }
                }
            }
        }

        out
    }

    fn on_frame(&mut self, frame: ServerFrame, out: &mut SessionOutput) {
        match frame {
            ServerFrame::Ping => {
                if self.pong {
                    out.outgoing.push(PONG_FRAME.to_string());
                }
            }
            ServerFrame::Connected { id, client, pong } => {
                if self.state != (SessionState::Connecting { id }) {
                    tracing::debug!(id, "Ignoring unexpected connect reply");
                    return;
                }
                tracing::info!(client = %client, "Centrifugo session established");
                self.pong = pong;
                self.send_subscribe(out);
            }
            ServerFrame::Subscribed { id } => {
                if self.state == (SessionState::Subscribing { id }) {
                    self.state = SessionState::Subscribed;
                    out.events
                        .push(FeedEvent::Subscription(SubscriptionEvent::Subscribed));
                }
            }
            ServerFrame::Error { id, code, message } => match self.state {
                SessionState::Connecting { id: pending } if pending == id => {
                    tracing::error!(id, code, message = %message, "Connect command rejected");
                    self.state = SessionState::Offline;
                    out.events
                        .push(FeedEvent::Connection(ConnectionEvent::Rejected { code }));
                    out.finished = true;
                }
                SessionState::Subscribing { id: pending } if pending == id => {
                    tracing::warn!(id, code, message = %message, "Subscribe command rejected");
                    self.state = SessionState::Offline;
                    out.events
                        .push(FeedEvent::Subscription(SubscriptionEvent::Error { code, message }));
                }
                _ => {
                    tracing::warn!(id, code, message = %message, "Unexpected error reply");
                }
            },
            ServerFrame::Publication {
                channel,
                data,
                offset,
            } => {
                if channel != self.channel || !self.is_subscribed() {
                    tracing::trace!(channel = %channel, "Ignoring publication");
                    return;
                }
                match serde_json::from_value::<Publication>(data) {
                    Ok(publication) => out.events.push(FeedEvent::Publication(publication)),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            offset = ?offset,
                            "Failed to decode publication payload"
                        );
                    }
                }
            }
            ServerFrame::Unsubscribed {
                channel,
                code,
                reason,
            } => {
                if channel != self.channel {
                    return;
                }
                out.events.push(FeedEvent::Subscription(
                    SubscriptionEvent::Unsubscribed { code, reason },
                ));
                if RESUBSCRIBE_CODES.contains(&code) {
                    tracing::info!(code, channel = %channel, "Server asked to resubscribe");
                    self.send_subscribe(out);
                } else {
                    self.state = SessionState::Offline;
                }
            }
            ServerFrame::Disconnect { code, reason } => {
                tracing::info!(code, reason = %reason, "Server requested disconnect");
            }
            ServerFrame::Other => {}
        }
    }

    fn send_subscribe(&mut self, out: &mut SessionOutput) {
        let id = self.next_command_id();
        out.outgoing.push(
            Command {
                id,
                method: Method::Subscribe(SubscribeRequest {
                    channel: self.channel.clone(),
                }),
            }
            .to_frame(),
        );
        self.state = SessionState::Subscribing { id };
        out.events
            .push(FeedEvent::Subscription(SubscriptionEvent::Subscribing));
    }

    fn next_command_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Centrifugo-backed delta feed
pub struct CentrifugeFeed {
    config: CentrifugeConfig,
}

impl CentrifugeFeed {
    /// Create a new feed
    pub fn new(config: CentrifugeConfig) -> Self {
        Self { config }
    }

    /// Create a feed from the `[feed]` config section
    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.into())
    }

    /// Channel this feed subscribes to
    pub fn channel(&self) -> &str {
        &self.config.channel
    }

    async fn run_session_loop(config: CentrifugeConfig, tx: mpsc::Sender<FeedEvent>) {
        let ws_config = WsConfig::new(&config.url)
            .max_reconnects(config.max_reconnects)
            .reconnect_delay(config.reconnect_delay)
            .ping_interval(config.ping_interval);

        let (mut ws_rx, ws_tx) = WsClient::new(ws_config).connect();
        let mut session = CentrifugeSession::new(config.token.clone(), &config.channel);

        if tx
            .send(FeedEvent::Connection(ConnectionEvent::Connecting))
            .await
            .is_err()
        {
            return;
        }

        while let Some(msg) = ws_rx.recv().await {
            let out = session.on_ws_message(msg);

            for frame in out.outgoing {
                if ws_tx.send(frame).await.is_err() {
                    tracing::error!("Failed to send command to WebSocket");
                    return;
                }
            }

            for event in out.events {
                if tx.send(event).await.is_err() {
                    tracing::debug!("Feed receiver dropped");
                    return;
                }
            }

            if out.finished {
                break;
            }
        }

        tracing::info!(channel = %config.channel, "Centrifugo feed stopped");
    }
}

#[async_trait]
impl BookFeed for CentrifugeFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<FeedEvent>> {
        if self.config.channel.is_empty() {
            anyhow::bail!("feed channel is not configured");
        }

        let (tx, rx) = mpsc::channel(self.config.buffer_size);
        let config = self.config.clone();

        tracing::info!(
            url = %config.url,
            channel = %config.channel,
            "Subscribing to Centrifugo feed"
        );

        tokio::spawn(async move {
            Self::run_session_loop(config, tx).await;
        });

        Ok(rx)
    }
}
