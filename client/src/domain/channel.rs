//! Push-channel supervision.
//!
//! Room membership is not preserved by the transport across reconnects, so
//! the join frame must be re-sent on every disconnected → connected
//! transition. That rule is a first-class transition of
//! [`ChannelStateMachine`] rather than an event-handler side effect; the
//! [`PushChannelClient`] supervisor merely drives the machine against the
//! transport and fans decoded events out to subscribers.
//!
//! Connectivity reaches the supervisor through the transport's watch
//! channel. A connection established before the supervisor starts, or a
//! flap too fast to observe transition by transition, still registers: the
//! watch always holds the current state and bumps its version per
//! transition.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::notification::{Notification, NotificationEvent};
use super::ports::push_transport::{NOTIFICATION_EVENT, OutboundFrame, PushFrame, PushTransport};
use super::user::UserId;

/// Buffered live events per subscriber before lag kicks in.
const EVENT_BUFFER: usize = 64;

/// Connection phase as tracked by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// No connection; the transport is redialling.
    Disconnected,
    /// Connected but the identity join frame has not been delivered.
    ConnectedUnjoined,
    /// Connected and joined to the identity's room.
    ConnectedJoined,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The transport reported a (re-)established connection.
    TransportUp,
    /// The transport reported a lost connection.
    TransportDown,
    /// The join frame was handed to the transport successfully.
    JoinSent,
    /// A user signed in (or switched identity).
    IdentityBound(UserId),
    /// The user signed out.
    IdentityCleared,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    /// Nothing to do.
    None,
    /// Send the join frame for this identity.
    SendJoin(UserId),
}

/// Pure transition table for room membership.
///
/// # Examples
/// ```
/// use client::domain::channel::{ChannelAction, ChannelEvent, ChannelPhase, ChannelStateMachine};
/// use client::domain::UserId;
///
/// let mut machine = ChannelStateMachine::new();
/// machine.handle(ChannelEvent::IdentityBound(UserId::new(7)));
/// assert_eq!(
///     machine.handle(ChannelEvent::TransportUp),
///     ChannelAction::SendJoin(UserId::new(7)),
/// );
/// machine.handle(ChannelEvent::JoinSent);
/// assert_eq!(machine.phase(), ChannelPhase::ConnectedJoined);
///
/// // Reconnects demand a fresh join: membership died with the connection.
/// machine.handle(ChannelEvent::TransportDown);
/// assert_eq!(
///     machine.handle(ChannelEvent::TransportUp),
///     ChannelAction::SendJoin(UserId::new(7)),
/// );
/// ```
#[derive(Debug)]
pub struct ChannelStateMachine {
    phase: ChannelPhase,
    identity: Option<UserId>,
}

impl ChannelStateMachine {
    /// Start disconnected with no identity bound.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: ChannelPhase::Disconnected,
            identity: None,
        }
    }

    /// Current connection phase.
    #[must_use]
    pub const fn phase(&self) -> ChannelPhase {
        self.phase
    }

    /// Currently bound identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<UserId> {
        self.identity
    }

    /// Apply one event and return the side effect the caller must perform.
    ///
    /// `TransportUp` always lands in [`ChannelPhase::ConnectedUnjoined`],
    /// even from `ConnectedJoined`: a connected report after missed flaps
    /// may sit on a fresh connection whose room membership is gone.
    pub const fn handle(&mut self, event: ChannelEvent) -> ChannelAction {
        match event {
            ChannelEvent::TransportUp => {
                self.phase = ChannelPhase::ConnectedUnjoined;
                match self.identity {
                    Some(user) => ChannelAction::SendJoin(user),
                    None => ChannelAction::None,
                }
            }
            ChannelEvent::TransportDown => {
                self.phase = ChannelPhase::Disconnected;
                ChannelAction::None
            }
            ChannelEvent::JoinSent => {
                if matches!(self.phase, ChannelPhase::ConnectedUnjoined) {
                    self.phase = ChannelPhase::ConnectedJoined;
                }
                ChannelAction::None
            }
            ChannelEvent::IdentityBound(user) => {
                self.identity = Some(user);
                match self.phase {
                    ChannelPhase::Disconnected => ChannelAction::None,
                    ChannelPhase::ConnectedUnjoined | ChannelPhase::ConnectedJoined => {
                        // A joined room may belong to the previous identity.
                        self.phase = ChannelPhase::ConnectedUnjoined;
                        ChannelAction::SendJoin(user)
                    }
                }
            }
            ChannelEvent::IdentityCleared => {
                self.identity = None;
                if matches!(self.phase, ChannelPhase::ConnectedJoined) {
                    self.phase = ChannelPhase::ConnectedUnjoined;
                }
                ChannelAction::None
            }
        }
    }
}

impl Default for ChannelStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded event delivered to feed subscribers.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// A live notification for the current identity.
    Notification(Notification),
}

/// Supervises the shared push connection for the whole client.
///
/// One instance exists per session factory; all feeds subscribe to the same
/// decoded event stream. The supervisor task ends when the client is
/// dropped.
#[derive(Debug)]
pub struct PushChannelClient {
    identity: watch::Sender<Option<UserId>>,
    events: broadcast::Sender<LiveEvent>,
    supervisor: JoinHandle<()>,
}

impl PushChannelClient {
    /// Spawn the supervisor over the given transport.
    ///
    /// Must be called from within a Tokio runtime. A transport that
    /// connected before this call is picked up from the connectivity watch;
    /// no transition needs to be observed.
    #[must_use]
    pub fn start(transport: Arc<dyn PushTransport>) -> Self {
        let (identity, identity_rx) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let connection = transport.connection();
        let frames = transport.frames();
        let supervisor = tokio::spawn(supervise(
            transport,
            connection,
            frames,
            identity_rx,
            events.clone(),
        ));
        Self {
            identity,
            events,
            supervisor,
        }
    }

    /// Bind the authenticated identity; the join frame is sent on the next
    /// connect (or immediately when already connected).
    pub fn join(&self, user: UserId) {
        self.identity.send_replace(Some(user));
    }

    /// Clear the bound identity on sign-out.
    pub fn leave(&self) {
        self.identity.send_replace(None);
    }

    /// Subscribe to decoded live events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.events.subscribe()
    }
}

impl Drop for PushChannelClient {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

async fn supervise(
    transport: Arc<dyn PushTransport>,
    mut connection: watch::Receiver<bool>,
    mut frames: broadcast::Receiver<PushFrame>,
    mut identity: watch::Receiver<Option<UserId>>,
    events: broadcast::Sender<LiveEvent>,
) {
    let mut machine = ChannelStateMachine::new();
    // The connection may predate this task; converge on the present state
    // before waiting for changes.
    if *connection.borrow_and_update() {
        let action = machine.handle(ChannelEvent::TransportUp);
        perform(&*transport, &mut machine, action).await;
    }
    loop {
        tokio::select! {
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let event = if *connection.borrow_and_update() {
                    ChannelEvent::TransportUp
                } else {
                    ChannelEvent::TransportDown
                };
                let action = machine.handle(event);
                perform(&*transport, &mut machine, action).await;
            }
            frame = frames.recv() => match frame {
                Ok(frame) => dispatch(frame, &events),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Connectivity lives on the watch, so lag here only
                    // costs payloads.
                    warn!(skipped, "Inbound push frame stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = identity.changed() => {
                if changed.is_err() {
                    break;
                }
                let event = (*identity.borrow_and_update())
                    .map_or(ChannelEvent::IdentityCleared, ChannelEvent::IdentityBound);
                let action = machine.handle(event);
                perform(&*transport, &mut machine, action).await;
            }
        }
    }
}

async fn perform(
    transport: &dyn PushTransport,
    machine: &mut ChannelStateMachine,
    action: ChannelAction,
) {
    let ChannelAction::SendJoin(user) = action else {
        return;
    };
    match transport.send(OutboundFrame::join_notify(user)).await {
        Ok(()) => {
            machine.handle(ChannelEvent::JoinSent);
        }
        Err(error) => {
            // The next Up transition retries the join; nothing else to do.
            warn!(error = %error, %user, "Failed to send join frame");
        }
    }
}

fn dispatch(frame: PushFrame, events: &broadcast::Sender<LiveEvent>) {
    if frame.event != NOTIFICATION_EVENT {
        debug!(event = %frame.event, "Ignoring unrecognised push frame");
        return;
    }
    match serde_json::from_value::<NotificationEvent>(frame.data) {
        Ok(payload) => {
            let notification = payload.into_notification(Utc::now());
            // Err means no subscriber is listening right now; that is fine.
            drop(events.send(LiveEvent::Notification(notification)));
        }
        Err(error) => {
            warn!(error = %error, "Rejected malformed notification payload");
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
