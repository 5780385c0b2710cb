use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{instrument, trace, warn};

use crate::core::env::EnvironmentConfig;
use crate::core::errors::ClientError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(180);
const EVENT_BUFFER: usize = 1024;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Stream session lifecycle. A session only exists once the handshake has
/// completed, so it observably starts `Open` and ends `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

const STATE_OPEN: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Lifecycle and data events, drained by the consumer on its own task so
/// handler work never blocks the socket read loop.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Handshake completed; always the first event.
    Open,
    /// Raw inbound payload. The session does not parse payload schemas.
    Message(String),
    /// Terminal; the session does not reconnect. Create a new session (with
    /// a fresh id counter) to resume.
    Closed,
}

struct Shared {
    sink: Mutex<WsSink>,
    state: AtomicU8,
    next_id: AtomicU64,
    events: mpsc::Sender<StreamEvent>,
}

impl Shared {
    fn state(&self) -> SessionState {
        match self.state.load(Ordering::SeqCst) {
            STATE_OPEN => SessionState::Open,
            _ => SessionState::Closed,
        }
    }

    /// Transition to `Closed`, emitting the event exactly once no matter
    /// how many paths (read loop, send failure, local close) race here.
    async fn mark_closed(&self) {
        if self.state.swap(STATE_CLOSED, Ordering::SeqCst) != STATE_CLOSED {
            let _ = self.events.send(StreamEvent::Closed).await;
        }
    }
}

/// One WebSocket connection to a venue channel family.
///
/// Single-writer: subscribe calls serialize on the sink lock, which also
/// guarantees that request ids are strictly increasing in wire order.
pub struct StreamSession {
    shared: Arc<Shared>,
    events: Option<mpsc::Receiver<StreamEvent>>,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}

impl StreamSession {
    /// Connect to the environment's market stream endpoint.
    pub async fn connect(config: &EnvironmentConfig) -> Result<Self, ClientError> {
        Self::connect_url(config.stream_base_url.clone()).await
    }

    /// Connect with an appended path segment identifying a specific channel,
    /// e.g. a coin-margined stream.
    pub async fn connect_channel(
        config: &EnvironmentConfig,
        channel_path: &str,
    ) -> Result<Self, ClientError> {
        Self::connect_url(format!("{}{}", config.stream_base_url, channel_path)).await
    }

    /// Connect to an explicit stream URL with a bounded handshake timeout.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn connect_url(url: String) -> Result<Self, ClientError> {
        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(&url));
        let (ws_stream, _) = handshake
            .await
            .map_err(|_| ClientError::Transport("WebSocket handshake timeout".to_string()))?
            .map_err(|e| ClientError::Transport(format!("WebSocket connection failed: {}", e)))?;

        let (sink, source) = ws_stream.split();
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        let shared = Arc::new(Shared {
            sink: Mutex::new(sink),
            state: AtomicU8::new(STATE_OPEN),
            next_id: AtomicU64::new(1),
            events: events_tx,
        });

        // Queue Open before the read loop can race a first message in.
        let _ = shared.events.send(StreamEvent::Open).await;

        tokio::spawn(read_loop(Arc::clone(&shared), source));
        tokio::spawn(keepalive_loop(Arc::clone(&shared)));

        Ok(Self {
            shared,
            events: Some(events_rx),
        })
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.shared.state() == SessionState::Open
    }

    /// Take ownership of the event channel to drain it on a dedicated task.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<StreamEvent>> {
        self.events.take()
    }

    /// Receive the next event, if the channel has not been taken.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Send a `SUBSCRIBE` command for the given channel names and return the
    /// request id used. Ids start at 1 and increase strictly; they are never
    /// reused within a session.
    #[instrument(skip(self, channels), fields(channel_count = channels.len()))]
    pub async fn subscribe(
        &self,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<u64, ClientError> {
        if !self.is_open() {
            return Err(ClientError::SessionNotOpen);
        }

        // Id assignment happens under the sink lock so ids match wire order.
        let mut sink = self.shared.sink.lock().await;
        if !self.is_open() {
            return Err(ClientError::SessionNotOpen);
        }
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let frame = encode_subscribe(channels, id);
        trace!("sending subscribe frame: {}", frame);

        if let Err(e) = sink.send(Message::Text(frame)).await {
            drop(sink);
            self.shared.mark_closed().await;
            return Err(ClientError::Transport(format!(
                "failed to send subscribe: {}",
                e
            )));
        }
        Ok(id)
    }

    /// Close the connection. Terminal; emits `Closed` if not already closed.
    #[instrument(skip(self))]
    pub async fn close(&self) -> Result<(), ClientError> {
        {
            let mut sink = self.shared.sink.lock().await;
            let _ = sink.send(Message::Close(None)).await;
        }
        self.shared.mark_closed().await;
        Ok(())
    }
}

fn encode_subscribe(channels: &[impl AsRef<str>], id: u64) -> String {
    let names: Vec<&str> = channels.iter().map(AsRef::as_ref).collect();
    json!({
        "method": "SUBSCRIBE",
        "params": names,
        "id": id,
    })
    .to_string()
}

async fn read_loop(shared: Arc<Shared>, mut source: WsSource) {
    while let Some(result) = source.next().await {
        match result {
            Ok(Message::Text(text)) => {
                // If the consumer dropped the receiver, keep draining the
                // socket so the close handshake still completes.
                let _ = shared.events.send(StreamEvent::Message(text)).await;
            }
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => {
                    let _ = shared.events.send(StreamEvent::Message(text)).await;
                }
                Err(e) => warn!("dropping non-UTF-8 binary frame: {}", e),
            },
            Ok(Message::Ping(data)) => {
                let mut sink = shared.sink.lock().await;
                if let Err(e) = sink.send(Message::Pong(data)).await {
                    warn!("failed to send pong: {}", e);
                }
            }
            Ok(Message::Pong(_) | Message::Frame(_)) => {}
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!("WebSocket read error: {}", e);
                break;
            }
        }
    }
    shared.mark_closed().await;
}

async fn keepalive_loop(shared: Arc<Shared>) {
    let mut interval = tokio::time::interval(KEEPALIVE_INTERVAL);
    interval.tick().await; // immediate first tick
    loop {
        interval.tick().await;
        if shared.state() != SessionState::Open {
            return;
        }
        let mut sink = shared.sink.lock().await;
        if sink.send(Message::Ping(Vec::new())).await.is_err() {
            drop(sink);
            shared.mark_closed().await;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn subscribe_frame_shape() {
        let frame = encode_subscribe(&["btcusdt@kline_1m", "ethusdt@ticker"], 7);
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["method"], "SUBSCRIBE");
        assert_eq!(value["id"], 7);
        assert_eq!(
            value["params"],
            serde_json::json!(["btcusdt@kline_1m", "ethusdt@ticker"])
        );
    }
}
