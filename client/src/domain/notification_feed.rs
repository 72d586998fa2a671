//! Notification feed: the reconciling store specialised for notifications.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use super::notification::{Notification, NotificationId};
use super::ports::rest::NotificationGateway;
use super::store::{ReconcilingStore, StoreSnapshot};

/// Notification collection with optimistic read-state handling.
///
/// Read confirmations are fire-and-forget: the local flip is applied before
/// the network call and deliberately kept even when the confirmation fails.
/// The product accepts a rare client/server divergence on the read flag in
/// exchange for zero UI flicker.
pub struct NotificationFeed {
    store: ReconcilingStore<Notification>,
    gateway: Arc<dyn NotificationGateway>,
}

impl NotificationFeed {
    /// Create a feed backed by the given gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn NotificationGateway>, page_size: usize) -> Self {
        Self {
            store: ReconcilingStore::new(page_size),
            gateway,
        }
    }

    /// Current observable state.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot<Notification> {
        self.store.snapshot()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot<Notification>> {
        self.store.subscribe()
    }

    /// Number of unread notifications, derived from the current collection.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.store
            .snapshot()
            .items
            .iter()
            .filter(|notification| !notification.is_read())
            .count()
    }

    /// Fetch the next backfill page.
    ///
    /// A no-op while a fetch is in flight or the collection is exhausted.
    /// Failures are logged and leave the cursor untouched; scrolling again
    /// retries naturally.
    pub async fn load_more(&self) {
        let Some(ticket) = self.store.begin_load() else {
            return;
        };
        let page = ticket.page();
        match self.gateway.fetch_page(page, self.store.page_size()).await {
            Ok(rows) => {
                let count = rows.len();
                self.store.complete_load(ticket, rows, count);
            }
            Err(error) => {
                warn!(error = %error, page, "Notification backfill failed");
                self.store.abort_load(ticket);
            }
        }
    }

    /// Insert a live notification at the head of the collection.
    pub fn apply_live_event(&self, notification: Notification) -> bool {
        self.store.apply_live_event(notification)
    }

    /// Optimistically mark one notification as read, then confirm.
    ///
    /// The returned handle drives the fire-and-forget confirmation; callers
    /// may drop it. `None` when the notification is unknown or already read.
    pub fn mark_read(&self, id: &NotificationId) -> Option<JoinHandle<()>> {
        if !self.store.mutate(id, Notification::mark_read) {
            return None;
        }
        let gateway = Arc::clone(&self.gateway);
        let id = id.clone();
        Some(tokio::spawn(async move {
            if let Err(error) = gateway.mark_read(&id).await {
                warn!(error = %error, %id, "Mark-read confirmation failed; keeping optimistic state");
            }
        }))
    }

    /// Optimistically mark every notification as read, then confirm once.
    ///
    /// `None` when nothing was unread.
    pub fn mark_all_read(&self) -> Option<JoinHandle<()>> {
        if self.store.mutate_each(Notification::mark_read) == 0 {
            return None;
        }
        let gateway = Arc::clone(&self.gateway);
        Some(tokio::spawn(async move {
            if let Err(error) = gateway.mark_all_read().await {
                warn!(error = %error, "Mark-all-read confirmation failed; keeping optimistic state");
            }
        }))
    }

    /// Clear the feed on identity change.
    pub fn reset(&self) {
        self.store.reset();
    }
}

#[cfg(test)]
#[path = "notification_feed_tests.rs"]
mod tests;
