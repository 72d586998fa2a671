//! Session wiring: one push channel, two feeds, one identity.
//!
//! [`FeedSession`] owns the shared push channel and both feed instances and
//! keeps them consistent across sign-in and sign-out. Live notifications are
//! forwarded from the channel into the notification feed by a background
//! task that lives exactly as long as the signed-in identity.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::ClientConfig;
use crate::domain::channel::{LiveEvent, PushChannelClient};
use crate::domain::friend_request_feed::FriendRequestFeed;
use crate::domain::notification_feed::NotificationFeed;
use crate::domain::ports::push_transport::PushTransport;
use crate::domain::ports::rest::{FriendRequestGateway, NotificationGateway};
use crate::domain::user::UserId;
use crate::outbound::http::BackendHttpGateway;
use crate::outbound::push::WebSocketTransport;

/// Everything a signed-in surface needs: feeds, counters, live updates.
pub struct FeedSession {
    channel: Arc<PushChannelClient>,
    notifications: Arc<NotificationFeed>,
    friend_requests: Arc<FriendRequestFeed>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl FeedSession {
    /// Assemble a session from explicit port implementations.
    ///
    /// Used directly by tests; production code goes through
    /// [`FeedSession::connect`].
    #[must_use]
    pub fn new(
        transport: Arc<dyn PushTransport>,
        notification_gateway: Arc<dyn NotificationGateway>,
        friend_request_gateway: Arc<dyn FriendRequestGateway>,
        page_size: usize,
    ) -> Self {
        Self {
            channel: Arc::new(PushChannelClient::start(transport)),
            notifications: Arc::new(NotificationFeed::new(notification_gateway, page_size)),
            friend_requests: Arc::new(FriendRequestFeed::new(friend_request_gateway, page_size)),
            forwarder: Mutex::new(None),
        }
    }

    /// Assemble a session against live backend adapters.
    ///
    /// The push connection starts dialling immediately; backfill waits for
    /// [`FeedSession::sign_in`].
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn connect(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let gateway = Arc::new(BackendHttpGateway::new(
            config.api_base.clone(),
            config.request_timeout,
        )?);
        let transport = Arc::new(WebSocketTransport::start(
            config.push_url.clone(),
            config.reconnect_delay,
        ));
        Ok(Self::new(
            transport,
            Arc::clone(&gateway) as Arc<dyn NotificationGateway>,
            gateway,
            config.page_size,
        ))
    }

    /// Bind an identity: join its push room, start forwarding live events,
    /// and run the initial backfill for both feeds plus the pending counter.
    ///
    /// Signing in over an existing identity tears the old one down first, so
    /// no data leaks across users.
    pub async fn sign_in(&self, user: UserId) {
        self.sign_out();

        // Subscribe before joining so a notification racing the join ack is
        // not lost.
        let live = self.channel.subscribe();
        self.channel.join(user);
        self.store_forwarder(Some(tokio::spawn(forward_live_events(
            live,
            Arc::clone(&self.notifications),
        ))));

        tokio::join!(
            self.notifications.load_more(),
            self.friend_requests.load_more(),
            self.friend_requests.refresh_pending_count(),
        );
    }

    /// Drop the bound identity: leave the push room, stop forwarding, and
    /// clear both feeds.
    pub fn sign_out(&self) {
        self.channel.leave();
        if let Some(forwarder) = self.store_forwarder(None) {
            forwarder.abort();
        }
        self.notifications.reset();
        self.friend_requests.reset();
    }

    /// The notification feed.
    #[must_use]
    pub fn notifications(&self) -> &NotificationFeed {
        &self.notifications
    }

    /// The friend request feed.
    #[must_use]
    pub fn friend_requests(&self) -> &FriendRequestFeed {
        &self.friend_requests
    }

    /// The shared push channel.
    #[must_use]
    pub fn channel(&self) -> &PushChannelClient {
        &self.channel
    }

    fn store_forwarder(&self, forwarder: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut slot = self
            .forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, forwarder)
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        if let Some(forwarder) = self.store_forwarder(None) {
            forwarder.abort();
        }
    }
}

async fn forward_live_events(
    mut live: broadcast::Receiver<LiveEvent>,
    notifications: Arc<NotificationFeed>,
) {
    loop {
        match live.recv().await {
            Ok(LiveEvent::Notification(notification)) => {
                notifications.apply_live_event(notification);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Live notification stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
