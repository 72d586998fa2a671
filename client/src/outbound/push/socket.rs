//! Tungstenite-backed push transport.
//!
//! Owns the dial/redial loop and the JSON frame codec. Every frame travels
//! as one WebSocket text message shaped `{"event": ..., "data": ...}`.
//! Connectivity is published on a watch channel that always holds the
//! current state; inbound frames fan out on a broadcast channel. The
//! adapter never interprets event names.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use crate::domain::ports::push_transport::{
    OutboundFrame, PushFrame, PushTransport, PushTransportError,
};

/// Inbound frames buffered per subscriber.
const FRAME_BUFFER: usize = 32;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// JSON envelope for every frame on the wire, in both directions.
#[derive(Debug, Serialize, Deserialize)]
struct WireFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Reconnecting WebSocket transport.
///
/// Dropping the transport stops the dial loop and closes the connection.
pub struct WebSocketTransport {
    connection: watch::Sender<bool>,
    frames: broadcast::Sender<PushFrame>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    supervisor: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Spawn the dial loop against the given endpoint.
    ///
    /// Must be called from within a Tokio runtime. The transport keeps
    /// redialling with the given delay until it is dropped.
    #[must_use]
    pub fn start(url: Url, reconnect_delay: Duration) -> Self {
        let (connection, _) = watch::channel(false);
        let (frames, _) = broadcast::channel(FRAME_BUFFER);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let supervisor = tokio::spawn(supervise(
            url,
            reconnect_delay,
            connection.clone(),
            frames.clone(),
            outbound_rx,
        ));
        Self {
            connection,
            frames,
            outbound,
            supervisor,
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    fn connection(&self) -> watch::Receiver<bool> {
        self.connection.subscribe()
    }

    fn frames(&self) -> broadcast::Receiver<PushFrame> {
        self.frames.subscribe()
    }

    async fn send(&self, frame: OutboundFrame) -> Result<(), PushTransportError> {
        if !*self.connection.borrow() {
            return Err(PushTransportError::disconnected("no active connection"));
        }
        self.outbound
            .send(frame)
            .map_err(|error| PushTransportError::send(error.to_string()))
    }
}

async fn supervise(
    url: Url,
    reconnect_delay: Duration,
    connection: watch::Sender<bool>,
    frames: broadcast::Sender<PushFrame>,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _response)) => {
                // send_replace bumps the watch version on every transition,
                // so observers see each flap even when values coalesce.
                connection.send_replace(true);
                run_connection(socket, &frames, &mut outbound).await;
                connection.send_replace(false);
            }
            Err(error) => {
                debug!(error = %error, endpoint = %url, "Push channel dial failed");
            }
        }
        // Frames queued for a dead connection belong to it; a fresh join
        // arrives once the domain sees the next connected state.
        while outbound.try_recv().is_ok() {}
        sleep(reconnect_delay).await;
    }
}

/// Pump one established connection until it dies.
async fn run_connection(
    socket: Socket,
    frames: &broadcast::Sender<PushFrame>,
    outbound: &mut mpsc::UnboundedReceiver<OutboundFrame>,
) {
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => dispatch_text(&text, frames),
                Some(Ok(Message::Ping(payload))) => {
                    if sink.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    debug!(error = %error, "Push channel read failed");
                    break;
                }
            },
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if !write_frame(&mut sink, frame).await {
                    break;
                }
            }
        }
    }
}

fn dispatch_text(text: &str, frames: &broadcast::Sender<PushFrame>) {
    match serde_json::from_str::<WireFrame>(text) {
        Ok(wire) => {
            // Err means no subscriber right now; frames are not queued.
            drop(frames.send(PushFrame {
                event: wire.event,
                data: wire.data,
            }));
        }
        Err(error) => {
            warn!(error = %error, "Dropping unparseable push frame");
        }
    }
}

async fn write_frame(
    sink: &mut (impl Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
    frame: OutboundFrame,
) -> bool {
    let wire = WireFrame {
        event: frame.event,
        data: frame.data,
    };
    let Ok(text) = serde_json::to_string(&wire) else {
        warn!(event = %wire.event, "Dropping unencodable outbound frame");
        return true;
    };
    match sink.send(Message::Text(text)).await {
        Ok(()) => true,
        Err(error) => {
            debug!(error = %error, "Push channel write failed");
            false
        }
    }
}
