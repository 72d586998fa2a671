//! Tests for the notification feed against a mocked gateway.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};

use super::*;
use crate::domain::notification::NotificationKind;
use crate::domain::ports::rest::{GatewayError, MockNotificationGateway};

const WAIT: Duration = Duration::from_secs(2);

fn note(id: &str) -> Notification {
    Notification::new(
        NotificationId::new(id),
        NotificationKind::Donation,
        "title",
        "message",
        Utc::now(),
    )
}

fn feed_with(mock: MockNotificationGateway, page_size: usize) -> NotificationFeed {
    NotificationFeed::new(Arc::new(mock), page_size)
}

#[tokio::test]
async fn full_page_appends_and_advances_cursor() {
    let mut mock = MockNotificationGateway::new();
    mock.expect_fetch_page()
        .withf(|page, limit| *page == 1 && *limit == 3)
        .times(1)
        .return_once(|_, _| Ok(vec![note("a"), note("b"), note("c")]));
    let feed = feed_with(mock, 3);

    feed.load_more().await;

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.items.len(), 3);
    assert_eq!(snapshot.page, 2);
    assert!(snapshot.has_more);
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn short_page_exhausts_the_collection() {
    let mut mock = MockNotificationGateway::new();
    mock.expect_fetch_page()
        .times(1)
        .return_once(|_, _| Ok(vec![note("a")]));
    let feed = feed_with(mock, 3);

    feed.load_more().await;
    // Exhausted; no second fetch may reach the gateway.
    feed.load_more().await;

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.items.len(), 1);
    assert!(!snapshot.has_more);
}

#[tokio::test]
async fn failed_fetch_leaves_cursor_for_retry() {
    let mut mock = MockNotificationGateway::new();
    mock.expect_fetch_page()
        .times(1)
        .return_once(|_, _| Err(GatewayError::transport("connection reset")));
    mock.expect_fetch_page()
        .withf(|page, _| *page == 1)
        .times(1)
        .return_once(|_, _| Ok(vec![note("a")]));
    let feed = feed_with(mock, 3);

    feed.load_more().await;
    assert!(feed.snapshot().items.is_empty());
    assert!(!feed.snapshot().loading);

    feed.load_more().await;
    assert_eq!(feed.snapshot().items.len(), 1);
}

/// Gateway whose fetch blocks until the test opens the gate, so a second
/// `load_more` can be issued while the first is still in flight.
struct GatedGateway {
    gate: Semaphore,
    calls: AtomicUsize,
}

#[async_trait]
impl NotificationGateway for GatedGateway {
    async fn fetch_page(
        &self,
        _page: u32,
        _limit: usize,
    ) -> Result<Vec<Notification>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await.expect("gate open");
        Ok(vec![note("a")])
    }

    async fn mark_read(&self, _id: &NotificationId) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[tokio::test]
async fn overlapping_load_more_issues_a_single_fetch() {
    let gateway = Arc::new(GatedGateway {
        gate: Semaphore::new(0),
        calls: AtomicUsize::new(0),
    });
    let as_port: Arc<dyn NotificationGateway> = Arc::clone(&gateway) as Arc<dyn NotificationGateway>;
    let feed = Arc::new(NotificationFeed::new(as_port, 3));

    let loader = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.load_more().await }
    });
    while !feed.snapshot().loading {
        sleep(Duration::from_millis(5)).await;
    }

    // The first fetch is parked at the gate; this one must not reach the
    // gateway at all.
    feed.load_more().await;

    gateway.gate.add_permits(1);
    timeout(WAIT, loader)
        .await
        .expect("first load finishes")
        .expect("loader task completes");

    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    assert_eq!(feed.snapshot().items.len(), 1);
}

#[tokio::test]
async fn mark_read_flips_locally_and_confirms_once() {
    let mut mock = MockNotificationGateway::new();
    mock.expect_mark_read()
        .withf(|id| id.as_str() == "a")
        .times(1)
        .return_once(|_| Ok(()));
    let feed = feed_with(mock, 3);
    feed.apply_live_event(note("a"));
    assert_eq!(feed.unread_count(), 1);

    let confirmation = feed.mark_read(&NotificationId::new("a"));
    // Observable before the confirmation resolves.
    assert_eq!(feed.unread_count(), 0);

    timeout(WAIT, confirmation.expect("first call confirms"))
        .await
        .expect("confirmation resolves")
        .expect("task completes");

    assert!(
        feed.mark_read(&NotificationId::new("a")).is_none(),
        "already read skips the network"
    );
}

#[tokio::test]
async fn mark_read_for_unknown_id_is_a_noop() {
    let feed = feed_with(MockNotificationGateway::new(), 3);
    assert!(feed.mark_read(&NotificationId::new("missing")).is_none());
}

#[tokio::test]
async fn failed_confirmation_keeps_optimistic_state() {
    let mut mock = MockNotificationGateway::new();
    mock.expect_mark_read()
        .times(1)
        .return_once(|_| Err(GatewayError::timeout("deadline exceeded")));
    let feed = feed_with(mock, 3);
    feed.apply_live_event(note("a"));

    let confirmation = feed.mark_read(&NotificationId::new("a"));
    timeout(WAIT, confirmation.expect("confirmation spawned"))
        .await
        .expect("confirmation resolves")
        .expect("task completes");

    assert_eq!(feed.unread_count(), 0, "no rollback on failure");
}

#[tokio::test]
async fn mark_all_read_confirms_with_a_single_request() {
    let mut mock = MockNotificationGateway::new();
    mock.expect_mark_all_read().times(1).return_once(|| Ok(()));
    let feed = feed_with(mock, 3);
    feed.apply_live_event(note("a"));
    feed.apply_live_event(note("b"));

    let confirmation = feed.mark_all_read();
    assert_eq!(feed.unread_count(), 0);

    timeout(WAIT, confirmation.expect("confirmation spawned"))
        .await
        .expect("confirmation resolves")
        .expect("task completes");

    assert!(
        feed.mark_all_read().is_none(),
        "nothing unread skips the network"
    );
}

#[tokio::test]
async fn live_events_prepend_and_deduplicate() {
    let feed = feed_with(MockNotificationGateway::new(), 3);

    assert!(feed.apply_live_event(note("a")));
    assert!(feed.apply_live_event(note("b")));
    assert!(!feed.apply_live_event(note("a")));

    let snapshot = feed.snapshot();
    let ids: Vec<&str> = snapshot
        .items
        .iter()
        .map(|n| n.id().as_str())
        .collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn reset_clears_items_and_restores_paging() {
    let mut mock = MockNotificationGateway::new();
    mock.expect_fetch_page()
        .times(1)
        .return_once(|_, _| Ok(vec![note("a")]));
    let feed = feed_with(mock, 3);
    feed.load_more().await;

    feed.reset();

    let snapshot = feed.snapshot();
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.page, 1);
    assert!(snapshot.has_more);
}
