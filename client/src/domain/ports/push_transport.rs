//! Port for the push-channel transport.
//!
//! Connectivity is modelled as state, not as events: the transport exposes a
//! watch channel that always holds the current connection flag, so a
//! subscriber that attaches late or misses intermediate flaps still
//! converges on the truth. Inbound frames travel on a separate broadcast
//! channel; losing a frame under lag costs one payload, never the
//! connection state. Reconnection is the transport's own concern; the
//! domain's only obligation is to re-send the identity join frame after
//! every observed transition to connected.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc, watch};

use super::macros::define_port_error;
use crate::domain::user::UserId;

/// Outbound event name announcing the authenticated user to the backend.
pub const JOIN_EVENT: &str = "join-notify";

/// Inbound event name carrying a live notification payload.
pub const NOTIFICATION_EVENT: &str = "notification";

/// Inbound frames buffered per subscriber before lag kicks in.
const FRAME_BUFFER: usize = 32;

define_port_error! {
    /// Errors surfaced by push transport adapters.
    pub enum PushTransportError {
        /// No connection is currently established.
        Disconnected { message: String } =>
            "push transport is disconnected: {message}",
        /// The frame could not be handed to the connection.
        Send { message: String } =>
            "push transport send failed: {message}",
    }
}

/// A named inbound event with its raw JSON payload.
///
/// Payload decoding happens in the domain so malformed frames are logged and
/// dropped in exactly one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFrame {
    /// Event name, e.g. [`NOTIFICATION_EVENT`].
    pub event: String,
    /// Raw payload; shape depends on the event name.
    pub data: Value,
}

/// A named outbound event with its JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    /// Event name, e.g. [`JOIN_EVENT`].
    pub event: String,
    /// Payload; shape depends on the event name.
    pub data: Value,
}

impl OutboundFrame {
    /// Build the identity join frame sent on every connect.
    #[must_use]
    pub fn join_notify(user: UserId) -> Self {
        Self {
            event: JOIN_EVENT.to_owned(),
            data: json!(user.as_u64()),
        }
    }
}

/// Driven port for the push-channel transport.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Observe connectivity. The receiver's current value is always the
    /// present connection state; every transition bumps the watch version
    /// even when flaps coalesce to the same value.
    fn connection(&self) -> watch::Receiver<bool>;

    /// Subscribe to inbound frames.
    fn frames(&self) -> broadcast::Receiver<PushFrame>;

    /// Send a frame over the current connection.
    async fn send(&self, frame: OutboundFrame) -> Result<(), PushTransportError>;
}

/// In-memory transport for tests.
///
/// Tests drive connectivity through [`FixturePushTransport::set_connected`],
/// inject traffic through [`FixturePushTransport::emit_frame`], and observe
/// sent frames through the receiver returned by
/// [`FixturePushTransport::take_sent`].
#[derive(Debug)]
pub struct FixturePushTransport {
    connection: watch::Sender<bool>,
    frames: broadcast::Sender<PushFrame>,
    sent_tx: mpsc::UnboundedSender<OutboundFrame>,
    sent_rx: Mutex<Option<mpsc::UnboundedReceiver<OutboundFrame>>>,
    fail_sends: std::sync::atomic::AtomicBool,
}

impl FixturePushTransport {
    /// Create a fixture with no connection established.
    #[must_use]
    pub fn new() -> Self {
        let (connection, _) = watch::channel(false);
        let (frames, _) = broadcast::channel(FRAME_BUFFER);
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        Self {
            connection,
            frames,
            sent_tx,
            sent_rx: Mutex::new(Some(sent_rx)),
            fail_sends: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Flip the connection state. Each call bumps the watch version, so
    /// back-to-back flips stay observable even when their values coalesce.
    pub fn set_connected(&self, connected: bool) {
        self.connection.send_replace(connected);
    }

    /// Emit an inbound frame to all subscribers.
    pub fn emit_frame(&self, frame: PushFrame) {
        // Dropped when nobody subscribed yet; tests subscribe first.
        drop(self.frames.send(frame));
    }

    /// Take the receiver observing sent frames. Yields `None` on a second
    /// call; the first caller owns the stream.
    pub fn take_sent(&self) -> Option<mpsc::UnboundedReceiver<OutboundFrame>> {
        self.sent_rx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }

    /// Make subsequent sends fail as if disconnected.
    pub fn set_send_failure(&self, fail: bool) {
        self.fail_sends
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Default for FixturePushTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushTransport for FixturePushTransport {
    fn connection(&self) -> watch::Receiver<bool> {
        self.connection.subscribe()
    }

    fn frames(&self) -> broadcast::Receiver<PushFrame> {
        self.frames.subscribe()
    }

    async fn send(&self, frame: OutboundFrame) -> Result<(), PushTransportError> {
        if self.fail_sends.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(PushTransportError::disconnected("fixture offline"));
        }
        self.sent_tx
            .send(frame)
            .map_err(|error| PushTransportError::send(error.to_string()))
    }
}
