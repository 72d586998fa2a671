//! Pending friend request feed.
//!
//! Holds only pending requests. Accept and decline remove the request
//! locally, decrement the pending counter, and confirm in the background;
//! the store's tombstones keep resolved requests from reappearing through
//! later backfill pages. The pending counter is sourced from a dedicated
//! count endpoint rather than derived from loaded pages, because the badge
//! must reflect requests the user has not scrolled to yet.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use super::friend_request::{FriendRequest, FriendRequestId};
use super::ports::rest::FriendRequestGateway;
use super::store::{ReconcilingStore, StoreSnapshot};

/// The decision confirmed for a resolved friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Accepted,
    Declined,
}

/// Pending friend requests with an independently sourced total.
pub struct FriendRequestFeed {
    store: ReconcilingStore<FriendRequest>,
    gateway: Arc<dyn FriendRequestGateway>,
    pending: watch::Sender<u64>,
}

impl FriendRequestFeed {
    /// Create a feed backed by the given gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn FriendRequestGateway>, page_size: usize) -> Self {
        let (pending, _) = watch::channel(0);
        Self {
            store: ReconcilingStore::new(page_size),
            gateway,
            pending,
        }
    }

    /// Current observable state.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot<FriendRequest> {
        self.store.snapshot()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot<FriendRequest>> {
        self.store.subscribe()
    }

    /// Total pending requests across all pages, loaded or not.
    #[must_use]
    pub fn pending_count(&self) -> u64 {
        *self.pending.borrow()
    }

    /// Subscribe to pending-count changes.
    #[must_use]
    pub fn subscribe_pending_count(&self) -> watch::Receiver<u64> {
        self.pending.subscribe()
    }

    /// Fetch the next backfill page.
    ///
    /// Rows that are no longer pending are dropped before insertion; the raw
    /// row count still drives the paging cursor so a page of freshly resolved
    /// requests does not end the backfill early.
    pub async fn load_more(&self) {
        let Some(ticket) = self.store.begin_load() else {
            return;
        };
        let page = ticket.page();
        match self.gateway.fetch_page(page, self.store.page_size()).await {
            Ok(rows) => {
                let raw = rows.len();
                let pending: Vec<FriendRequest> = rows
                    .into_iter()
                    .filter(FriendRequest::is_pending)
                    .collect();
                self.store.complete_load(ticket, pending, raw);
            }
            Err(error) => {
                warn!(error = %error, page, "Friend request backfill failed");
                self.store.abort_load(ticket);
            }
        }
    }

    /// Insert a live friend request at the head of the collection.
    ///
    /// Non-pending payloads are ignored; a resolved request has no place in
    /// this feed. The pending counter moves with the insert.
    pub fn apply_live_event(&self, request: FriendRequest) -> bool {
        if !request.is_pending() {
            return false;
        }
        let inserted = self.store.apply_live_event(request);
        if inserted {
            self.pending.send_modify(|count| *count += 1);
        }
        inserted
    }

    /// Refresh the pending counter from the dedicated count endpoint.
    ///
    /// The fetched value is discarded when the feed was reset while the
    /// request was in flight, so a stale count never lands on a fresh
    /// session.
    pub async fn refresh_pending_count(&self) {
        let epoch = self.store.epoch();
        match self.gateway.fetch_pending_count().await {
            Ok(count) => {
                if self.store.is_current(epoch) {
                    self.pending.send_replace(count);
                }
            }
            Err(error) => {
                warn!(error = %error, "Pending count refresh failed");
            }
        }
    }

    /// Optimistically accept a request, then confirm.
    ///
    /// The request leaves the collection and the counter drops before the
    /// network round trip. `None` when the identifier was already resolved.
    pub fn accept(&self, id: &FriendRequestId) -> Option<JoinHandle<()>> {
        self.resolve(id, Resolution::Accepted)
    }

    /// Optimistically decline a request, then confirm.
    ///
    /// `None` when the identifier was already resolved.
    pub fn decline(&self, id: &FriendRequestId) -> Option<JoinHandle<()>> {
        self.resolve(id, Resolution::Declined)
    }

    fn resolve(&self, id: &FriendRequestId, resolution: Resolution) -> Option<JoinHandle<()>> {
        if !self.store.retire(id) {
            return None;
        }
        self.pending
            .send_modify(|count| *count = count.saturating_sub(1));
        let gateway = Arc::clone(&self.gateway);
        let id = id.clone();
        Some(tokio::spawn(async move {
            let outcome = match resolution {
                Resolution::Accepted => gateway.accept(&id).await,
                Resolution::Declined => gateway.decline(&id).await,
            };
            if let Err(error) = outcome {
                warn!(
                    error = %error,
                    %id,
                    ?resolution,
                    "Friend request confirmation failed; keeping optimistic state"
                );
            }
        }))
    }

    /// Clear the feed and counter on identity change.
    pub fn reset(&self) {
        self.store.reset();
        self.pending.send_replace(0);
    }
}

#[cfg(test)]
#[path = "friend_request_feed_tests.rs"]
mod tests;
