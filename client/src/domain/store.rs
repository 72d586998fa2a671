//! Generic reconciling store.
//!
//! Merges three input sources into one deduplicated, recency-ordered
//! collection: paginated REST backfill (appended at the tail), push-channel
//! live events (prepended at the head), and optimistic local mutations.
//! The collection is published to the view layer through a watch channel;
//! every mutation replaces the observable snapshot.
//!
//! Concurrency contract: the state mutex is never held across an await.
//! Backfill is serialised by the loading flag (a second `begin_load` while
//! one is in flight is a no-op), while live events and local mutations may
//! interleave freely because every insert path shares the seen-id dedup set.
//! A `reset` bumps the epoch so in-flight backfill results resolving
//! afterwards are discarded instead of leaking across identities.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// First backfill page requested after construction or reset.
const INITIAL_PAGE: u32 = 1;

/// An item that can live in a [`ReconcilingStore`].
pub trait FeedItem: Clone + Send + Sync + 'static {
    /// Unique identifier type used for deduplication and retirement.
    type Id: Clone + Eq + Hash + std::fmt::Debug + Send + Sync + 'static;

    /// Return the item's identifier.
    fn id(&self) -> Self::Id;
}

/// Observable state published to the view layer.
#[derive(Debug, Clone)]
pub struct StoreSnapshot<T> {
    /// Items in display order, newest first.
    pub items: Vec<T>,
    /// Whether a backfill fetch is in flight.
    pub loading: bool,
    /// Whether another page may exist.
    pub has_more: bool,
    /// Next page cursor.
    pub page: u32,
}

/// Permission to run one backfill fetch.
///
/// Returned by [`ReconcilingStore::begin_load`] and consumed by exactly one
/// of [`ReconcilingStore::complete_load`] or [`ReconcilingStore::abort_load`].
/// The embedded epoch invalidates the ticket across a reset.
#[derive(Debug)]
pub struct LoadTicket {
    page: u32,
    epoch: u64,
}

impl LoadTicket {
    /// The page number to request from the backend.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }
}

#[derive(Debug)]
struct State<T: FeedItem> {
    items: Vec<T>,
    seen: HashSet<T::Id>,
    retired: HashSet<T::Id>,
    page: u32,
    has_more: bool,
    loading: bool,
    epoch: u64,
}

impl<T: FeedItem> State<T> {
    fn initial(epoch: u64) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            retired: HashSet::new(),
            page: INITIAL_PAGE,
            has_more: true,
            loading: false,
            epoch,
        }
    }

    fn snapshot(&self) -> StoreSnapshot<T> {
        StoreSnapshot {
            items: self.items.clone(),
            loading: self.loading,
            has_more: self.has_more,
            page: self.page,
        }
    }
}

/// Deduplicated, recency-ordered item collection with paginated backfill.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use client::domain::{Notification, NotificationId, NotificationKind, ReconcilingStore};
///
/// let store = ReconcilingStore::<Notification>::new(10);
/// let note = Notification::new(
///     NotificationId::new("n-1"),
///     NotificationKind::System,
///     "Welcome",
///     "Thanks for joining",
///     Utc::now(),
/// );
/// assert!(store.apply_live_event(note.clone()));
/// assert!(!store.apply_live_event(note), "duplicates are dropped");
/// assert_eq!(store.snapshot().items.len(), 1);
/// ```
#[derive(Debug)]
pub struct ReconcilingStore<T: FeedItem> {
    state: Mutex<State<T>>,
    page_size: usize,
    publisher: watch::Sender<StoreSnapshot<T>>,
}

impl<T: FeedItem> ReconcilingStore<T> {
    /// Create an empty store with the given backfill page size.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        let state = State::initial(0);
        let (publisher, _) = watch::channel(state.snapshot());
        Self {
            state: Mutex::new(state),
            page_size,
            publisher,
        }
    }

    /// The number of items requested per backfill page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current observable state.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot<T> {
        self.lock().snapshot()
    }

    /// Subscribe to state changes. Every mutation publishes a new snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot<T>> {
        self.publisher.subscribe()
    }

    /// Claim the right to fetch the next page.
    ///
    /// Returns `None` when a fetch is already in flight or the collection is
    /// exhausted; both are no-ops for the caller, not errors. On success the
    /// loading flag is raised until the ticket is consumed.
    pub fn begin_load(&self) -> Option<LoadTicket> {
        let mut state = self.lock();
        if state.loading || !state.has_more {
            return None;
        }
        state.loading = true;
        let ticket = LoadTicket {
            page: state.page,
            epoch: state.epoch,
        };
        self.publish(&state);
        Some(ticket)
    }

    /// Apply a successfully fetched page.
    ///
    /// `fetched` is the raw row count the backend returned, before any
    /// caller-side filtering; it alone decides whether more pages exist.
    /// Items whose identifier was already seen this session are skipped.
    /// Tickets from before a reset are discarded wholesale.
    pub fn complete_load(&self, ticket: LoadTicket, items: Vec<T>, fetched: usize) {
        let mut state = self.lock();
        if ticket.epoch != state.epoch {
            return;
        }
        for item in items {
            let id = item.id();
            if state.seen.insert(id) {
                state.items.push(item);
            }
        }
        state.page = ticket.page.saturating_add(1);
        state.has_more = fetched == self.page_size;
        state.loading = false;
        self.publish(&state);
    }

    /// Release a ticket after a failed fetch, leaving cursor and items
    /// untouched so the caller can retry later.
    pub fn abort_load(&self, ticket: LoadTicket) {
        let mut state = self.lock();
        if ticket.epoch != state.epoch {
            return;
        }
        state.loading = false;
        self.publish(&state);
    }

    /// Prepend a live item.
    ///
    /// Arrival recency, not the item's own timestamp, drives placement: a
    /// live item always lands at the head of the collection. Returns `false`
    /// without touching state when the identifier was already seen.
    pub fn apply_live_event(&self, item: T) -> bool {
        let mut state = self.lock();
        let id = item.id();
        if !state.seen.insert(id) {
            return false;
        }
        state.items.insert(0, item);
        self.publish(&state);
        true
    }

    /// Apply an optimistic transform to the item with the given identifier.
    ///
    /// The transform reports whether it changed anything; unchanged and
    /// missing items both yield `false` and publish nothing, which makes
    /// rapid duplicate invocations harmless.
    pub fn mutate(&self, id: &T::Id, transform: impl FnOnce(&mut T) -> bool) -> bool {
        let mut state = self.lock();
        let Some(item) = state.items.iter_mut().find(|item| item.id() == *id) else {
            return false;
        };
        let changed = transform(item);
        if changed {
            self.publish(&state);
        }
        changed
    }

    /// Apply an optimistic transform to every item, returning how many
    /// items actually changed.
    pub fn mutate_each(&self, mut transform: impl FnMut(&mut T) -> bool) -> usize {
        let mut state = self.lock();
        let mut changed = 0;
        for item in &mut state.items {
            if transform(item) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.publish(&state);
        }
        changed
    }

    /// Remove an item and tombstone its identifier for the session.
    ///
    /// A retired identifier never re-enters the collection, whether through
    /// backfill or live events. Returns `false` when the identifier was
    /// already retired, so double-clicks collapse to one removal.
    pub fn retire(&self, id: &T::Id) -> bool {
        let mut state = self.lock();
        if !state.retired.insert(id.clone()) {
            return false;
        }
        state.seen.insert(id.clone());
        state.items.retain(|item| item.id() != *id);
        self.publish(&state);
        true
    }

    /// Clear all state back to initial values and invalidate outstanding
    /// tickets. Invoked on identity change so no data leaks across sessions.
    pub fn reset(&self) {
        let mut state = self.lock();
        *state = State::initial(state.epoch.wrapping_add(1));
        self.publish(&state);
    }

    /// Current session epoch, for guarding fetches that live outside the
    /// store (e.g. independently sourced counters).
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Whether the given epoch still identifies the current session.
    #[must_use]
    pub fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &State<T>) {
        self.publisher.send_replace(state.snapshot());
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
